pub mod config;
pub mod frames;
pub mod keypoints;
pub mod openpose;
pub mod pipeline;
pub mod smplify;
pub mod stage;
pub mod upload;
pub mod viewer;

fn main() {
    // Keep GIT_VERSION fresh across commits and checkouts
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let describe = std::process::Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output();

    let version = match describe {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        // tarball builds and environments without git
        _ => "unknown".to_string(),
    };

    println!("cargo:rustc-env=GIT_VERSION={version}");
}

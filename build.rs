// Build script - stamps the demo banner with build time and commit
use std::process::Command;

fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let timestamp = if cfg!(windows) {
        run("powershell", &["-Command", "(Get-Date).ToUniversalTime().ToString('yyyy-MM-dd HH:mm:ss')"])
    } else {
        run("date", &["-u", "+%Y-%m-%d %H:%M:%S"])
    };
    let commit = run("git", &["rev-parse", "--short", "HEAD"]);

    println!("cargo:rustc-env=BUILD_TIMESTAMP={} UTC", timestamp);
    println!("cargo:rustc-env=BUILD_COMMIT={}", commit);
}

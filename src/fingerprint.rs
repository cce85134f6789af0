/// Guess the remote OS from a service banner.
///
/// Case-insensitive substring match in fixed priority order; first match wins.
pub fn guess_os(banner: &str) -> &'static str {
    let b = banner.to_lowercase();
    if b.contains("ubuntu") || b.contains("debian") {
        "Linux (Debian/Ubuntu)"
    } else if b.contains("windows") || b.contains("microsoft") {
        "Windows Server"
    } else if b.contains("apache") {
        "Likely Linux/Unix"
    } else {
        "Unknown OS"
    }
}

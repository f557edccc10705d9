/// Version string of the binaries and the library they are built on
pub fn get_version_string() -> String {
    format!(
        "tagcheck {} (libtagcheck {})",
        env!("CARGO_PKG_VERSION"),
        libtagcheck::version()
    )
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;

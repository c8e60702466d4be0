fn main() {
    // The embuild sysenv output is only meaningful when building for the
    // ESP-IDF target; host-side test builds skip it.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}

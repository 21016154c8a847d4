fn main() {
    // ESP-IDF link arguments are only needed for the on-target build; the
    // host simulation and test builds have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

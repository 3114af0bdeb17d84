fn main() {
    std::process::exit(pdffill::run());
}

fn main() {
    afm_roughness::cli::run();
}

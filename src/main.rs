fn main() {
    poslog_pipeline::cli::run();
}

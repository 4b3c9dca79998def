fn main() -> anyhow::Result<()> {
    ecodiet::cli::run()
}

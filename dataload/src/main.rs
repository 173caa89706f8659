fn main() -> anyhow::Result<()> {
    dataload_cli::run()
}

use anyhow::{Context, Result};
use colored::Colorize;
use testdeck_infrastructure::ConfigService;

pub fn init(service: &ConfigService) -> Result<()> {
    let (path, created) = service
        .ensure_default()
        .context("Failed to write the default configuration")?;
    if created {
        println!("{} {}", "Created".green(), path.display());
    } else {
        println!("{} {}", "Already exists:".yellow(), path.display());
    }
    Ok(())
}

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.load().context("Failed to load configuration")?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

pub fn path(service: &ConfigService) -> Result<()> {
    println!("{}", service.path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use testdeck_infrastructure::TestdeckPaths;

    #[test]
    fn test_init_creates_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::with_paths(TestdeckPaths::with_base(dir.path()));

        init(&service).unwrap();
        let path = service.path().unwrap();
        assert!(path.exists());
        let first = std::fs::read_to_string(&path).unwrap();

        init(&service).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
        show(&service).unwrap();
    }
}

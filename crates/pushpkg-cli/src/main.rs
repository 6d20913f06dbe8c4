//! Command-line interface for building Safari push packages.
//!
//! Validates `website.json` and the icon set, writes `manifest.json`, signs it
//! with a PKCS#12 certificate, and writes `pushPackage.zip`.

use clap::Parser;
use pushpkg::{Backend, NoPassword, PasswordProvider, PromptPassword, PushPackage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pushpkg")]
#[command(about = "Build a signed Safari push package (pushPackage.zip)")]
struct Cli {
    /// The path to website.json file
    #[arg(short = 'w', long, default_value = "website.json")]
    website_json: PathBuf,

    /// The path to the iconset directory
    #[arg(short = 'i', long, default_value = "icon.iconset")]
    icon_set: PathBuf,

    /// The path to the p12 file used for signing manifest.json
    #[arg(short = 'c', long)]
    certificate: PathBuf,

    /// The path to the Apple WWDR intermediate certificate (.cer/.pem)
    #[arg(short = 'z', long)]
    intermediate_certificate: PathBuf,

    /// Prompt for the p12 password on the terminal
    #[arg(short = 'p', long)]
    password: bool,

    /// The output directory for pushPackage.zip
    #[arg(short = 'o', long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory receiving manifest.json and signature
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Abort when website.json or the icon set fail validation
    #[arg(long)]
    strict: bool,

    /// Signing backend: external, openssl, or pure
    #[arg(long, default_value = "external")]
    backend: Backend,

    /// openssl binary used by the external backend
    #[arg(long, default_value = "openssl")]
    openssl: PathBuf,

    /// ZIP compression level (0-9)
    #[arg(long, default_value = "6")]
    compression_level: u32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    tracing::debug!(backend = %cli.backend, "using signer backend");

    let password = if cli.password {
        PromptPassword::default().password()?
    } else {
        NoPassword.password()?
    };

    let signer: Box<dyn pushpkg::Signer> = match cli.backend {
        Backend::External => Box::new(
            pushpkg::ExternalSigner::new(&cli.certificate, &cli.intermediate_certificate, password)
                .program(&cli.openssl),
        ),
        backend => backend.signer(&cli.certificate, &cli.intermediate_certificate, password)?,
    };

    let report = PushPackage::new()
        .website_json(&cli.website_json)
        .icon_set(&cli.icon_set)
        .work_dir(&cli.work_dir)
        .output_dir(&cli.output_dir)
        .strict(cli.strict)
        .compression_level(cli.compression_level)
        .build(&signer)?;

    if !report.validation.is_ok() {
        eprintln!(
            "Warning: {} validation problem(s); the package may be rejected",
            report.validation.problems().len()
        );
    }

    println!("Created: {}", report.package_path.display());
    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pushpkg", "-c", "cert.p12", "-z", "wwdr.cer"]).unwrap();
        assert_eq!(cli.website_json, PathBuf::from("website.json"));
        assert_eq!(cli.icon_set, PathBuf::from("icon.iconset"));
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.backend, Backend::External);
        assert_eq!(cli.compression_level, 6);
        assert!(!cli.password);
        assert!(!cli.strict);
    }

    #[test]
    fn test_certificate_and_intermediate_required() {
        assert!(Cli::try_parse_from(["pushpkg"]).is_err());
        assert!(Cli::try_parse_from(["pushpkg", "-c", "cert.p12"]).is_err());
        assert!(Cli::try_parse_from(["pushpkg", "-z", "wwdr.cer"]).is_err());
    }

    #[test]
    fn test_all_short_flags() {
        let cli = Cli::try_parse_from([
            "pushpkg", "-w", "site.json", "-i", "icons", "-c", "cert.p12", "-z", "wwdr.cer", "-p",
            "-o", "dist", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.website_json, PathBuf::from("site.json"));
        assert_eq!(cli.icon_set, PathBuf::from("icons"));
        assert_eq!(cli.certificate, PathBuf::from("cert.p12"));
        assert_eq!(cli.intermediate_certificate, PathBuf::from("wwdr.cer"));
        assert!(cli.password);
        assert_eq!(cli.output_dir, PathBuf::from("dist"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_backend_flag() {
        let cli = Cli::try_parse_from([
            "pushpkg", "-c", "c.p12", "-z", "z.cer", "--backend", "pure", "--strict",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::Pure);
        assert!(cli.strict);

        assert!(Cli::try_parse_from([
            "pushpkg", "-c", "c.p12", "-z", "z.cer", "--backend", "gpg",
        ])
        .is_err());
    }
}

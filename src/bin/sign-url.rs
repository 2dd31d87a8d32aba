use clap::{Parser, Subcommand};

use image_proxy::rewrite::{ImageUrlRewriter, Rewritten};
use image_proxy::security::{sign, verify, SigningKey, TrustedDomains, UrlSigner};

#[derive(Parser)]
#[command(name = "sign-url")]
#[command(about = "Create and check signed image proxy links", long_about = None)]
struct Cli {
    /// Environment variable holding the signing secret
    #[arg(long, default_value = "IMAGE_PROXY_SECRET")]
    secret_env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signature for a URL
    Sign { url: String },
    /// Print the src an <img> should use for a URL
    Link {
        url: String,
        /// Proxy endpoint, optionally with origin
        #[arg(short, long, default_value = "/image-proxy")]
        endpoint: String,
        /// Hosts linked directly instead of proxied
        #[arg(short, long)]
        trusted: Vec<String>,
    },
    /// Check a signature; exits non-zero when it does not match
    Verify { url: String, sig: String },
    /// Fetch a URL through a running proxy and report the result
    Probe {
        url: String,
        #[arg(short, long, default_value = "http://localhost:8080")]
        server: String,
        #[arg(short, long, default_value = "/image-proxy")]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let key = std::env::var(&cli.secret_env)
        .ok()
        .and_then(SigningKey::new)
        .ok_or_else(|| format!("{} is not set", cli.secret_env))?;

    match cli.command {
        Commands::Sign { url } => {
            println!("{}", sign(&url, &key));
        }
        Commands::Link {
            url,
            endpoint,
            trusted,
        } => {
            let rewriter = ImageUrlRewriter::new(UrlSigner::new(key, endpoint), TrustedDomains::new(&trusted));
            match rewriter.rewrite(&url) {
                Rewritten::Blocked => {
                    eprintln!("Error: URL is not allowed by the proxy policy");
                    std::process::exit(1);
                }
                other => {
                    if let Some(src) = other.into_src() {
                        println!("{src}");
                    }
                }
            }
        }
        Commands::Verify { url, sig } => {
            if verify(&url, Some(&sig), Some(&key)) {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        Commands::Probe {
            url,
            server,
            endpoint,
        } => {
            let signer = UrlSigner::new(key, format!("{}{}", server.trim_end_matches('/'), endpoint));
            let link = signer.build_proxy_url(&url);
            let res = reqwest::get(&link).await?;
            let status = res.status();
            let content_type = res
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let body = res.bytes().await?;

            println!("status:       {status}");
            println!("content-type: {content_type}");
            println!("bytes:        {}", body.len());
            if !status.is_success() {
                println!("message:      {}", String::from_utf8_lossy(&body));
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

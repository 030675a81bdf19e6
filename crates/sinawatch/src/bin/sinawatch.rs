//! SinaWatch CLI - send a signed alert from the command line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sinawatch::{AlertClient, ClientConfig, Content, Operation, Receiver};

/// Send an alert through the SinaWatch alerting service.
#[derive(Parser)]
#[command(name = "sinawatch")]
#[command(about = "Send a signed alert to SinaWatch")]
struct Cli {
    /// Key id (or set `SINAWATCH_KID` env var).
    #[arg(long, env = "SINAWATCH_KID")]
    kid: String,

    /// Shared secret (or set `SINAWATCH_PASSWORD` env var).
    #[arg(long, env = "SINAWATCH_PASSWORD", hide_env_values = true)]
    password: String,

    /// Use the internal network endpoint.
    #[arg(long, env = "SINAWATCH_ICONNECT", default_value = "false")]
    iconnect: bool,

    /// Override the base host (scheme included).
    #[arg(long, env = "SINAWATCH_HOST")]
    host: Option<String>,

    /// Service port.
    #[arg(long, env = "SINAWATCH_PORT", default_value = "80")]
    port: u16,

    /// Request timeout in seconds.
    #[arg(long, env = "SINAWATCH_TIMEOUT", default_value = "1")]
    timeout: u64,

    /// Source address reported in `x-sinawatch-ip`.
    #[arg(long, env = "SINAWATCH_IP")]
    ip: Option<String>,

    /// Service version tag.
    #[arg(long, default_value = "")]
    sv: String,

    /// Service name.
    #[arg(long)]
    service: String,

    /// Object the alert is about.
    #[arg(long, default_value = "")]
    object: String,

    /// Subject line.
    #[arg(long)]
    subject: String,

    /// Plain-text body.
    #[arg(long, default_value = "")]
    content: String,

    /// HTML body.
    #[arg(long, default_value = "")]
    html: String,

    #[arg(long, default_value = "")]
    mail: String,
    #[arg(long, default_value = "")]
    sms: String,
    #[arg(long, default_value = "")]
    ivr: String,
    #[arg(long, default_value = "")]
    weibo: String,
    #[arg(long, default_value = "")]
    wechat: String,
    #[arg(long, default_value = "")]
    push: String,
    #[arg(long, default_value = "")]
    mail_group: String,
    #[arg(long, default_value = "")]
    sms_group: String,
    #[arg(long, default_value = "")]
    ivr_group: String,
    #[arg(long, default_value = "")]
    weibo_group: String,
    #[arg(long, default_value = "")]
    wechat_group: String,
    #[arg(long, default_value = "")]
    push_group: String,

    /// Let the service merge similar alerts (0 or 1).
    #[arg(long, default_value = "0")]
    auto_merge: i32,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.kid, &self.password, self.iconnect)
            .with_port(self.port)
            .with_timeout(self.timeout);
        if let Some(host) = &self.host {
            config = config.with_host(host);
        }
        if let Some(ip) = &self.ip {
            config = config.with_source_ip(ip);
        }
        config
    }

    fn receiver(&self) -> Receiver {
        Receiver {
            mail: self.mail.clone(),
            sms: self.sms.clone(),
            ivr: self.ivr.clone(),
            weibo: self.weibo.clone(),
            wechat: self.wechat.clone(),
            push: self.push.clone(),
            mail_group: self.mail_group.clone(),
            sms_group: self.sms_group.clone(),
            ivr_group: self.ivr_group.clone(),
            weibo_group: self.weibo_group.clone(),
            wechat_group: self.wechat_group.clone(),
            push_group: self.push_group.clone(),
        }
    }

    /// Reject alerts nobody would receive or that carry no body.
    fn validate(&self) -> Result<()> {
        if self.receiver().is_empty() {
            bail!(
                "No receiver given: set at least one of --mail, --sms, --ivr, \
                 --weibo, --wechat, --push or a group"
            );
        }
        if self.content.is_empty() && self.html.is_empty() {
            bail!("Alert needs --content or --html");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli.validate()?;
    let receiver = cli.receiver();

    let client = AlertClient::from_config(cli.config());
    let operation = Operation {
        sv: cli.sv.clone(),
        service: cli.service.clone(),
        object: cli.object.clone(),
    };
    let content = Content {
        subject: cli.subject.clone(),
        content: cli.content.clone(),
        html: cli.html.clone(),
    };

    let response = client
        .send_alert(&operation, &content, &receiver, cli.auto_merge)
        .context("Failed to send alert")?;

    info!(service = %operation.service, "Alert accepted");
    println!("{}", serde_json::Value::Object(response.fields().clone()));

    Ok(())
}

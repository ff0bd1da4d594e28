use clap::Parser;
use std::process::ExitCode;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tsprobe::config::DemuxConfig;
use tsprobe::ts::TSDemuxer;

#[derive(Parser)]
struct Opt {
    /// Transport stream file to probe ("-" for stdin)
    input: String,

    /// Program id to track; overrides tsprobe.toml and TSPROBE_TARGET_PID
    #[clap(long)]
    pid: Option<u16>,

    /// Ring buffer capacity in bytes
    #[clap(long)]
    buffer: Option<usize>,

    /// Fail on buffer overflow instead of throttling the reader
    #[clap(long, default_value_t = false)]
    non_blocking: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::parse();

    let mut config = DemuxConfig::load()?;
    if let Some(pid) = opt.pid {
        config = config.with_target_pid(pid);
    }
    if let Some(capacity) = opt.buffer {
        config = config.with_buffer_capacity(capacity);
    }
    if opt.non_blocking {
        config = config.with_blocking(false);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupted, stopping");
                cancel.cancel();
            }
        });
    }

    // the report itself is logged by the default sink
    let report = if opt.input == "-" {
        TSDemuxer::new(BufReader::new(tokio::io::stdin()), config)?
            .run(cancel)
            .await?
    } else {
        let file = File::open(&opt.input).await?;
        TSDemuxer::new(BufReader::new(file), config)?
            .run(cancel)
            .await?
    };

    if report.continuity_error_count > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

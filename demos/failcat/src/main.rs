//! A deliberately tiny `cat`: one 4 KiB read from stdin, written to stdout
//! in as few writes as possible. Both paths consult faultline points, so a
//! run gives a controlled number of operations to inject failures into.
//!
//! Environment:
//! - `FAILCAT_ENABLE`: colon-separated point specs of the form
//!   `name[,probability_percent[,failnum[,failinfo]]]`. A negative or
//!   missing probability enables the point unconditionally.
//! - `FAILCAT_CTRL_FIFO`: basename for the remote-control pipes; when set,
//!   `failcat` can be reconfigured externally while it blocks on stdin.
//!
//! ```text
//! $ FAILCAT_ENABLE="failcat/write,50,1:failcat/read" failcat < notes.txt
//! ```

mod logger;

use std::env;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use faultline::PointFlags;

const BUF_SIZE: usize = 4096;

fn main() -> Result<()> {
    let _logger = logger::init()?;
    faultline::init()?;

    if let Ok(base) = env::var("FAILCAT_CTRL_FIFO") {
        if !base.is_empty() {
            faultline::rc_fifo(&base).context("setting up the control fifo")?;
            log::info!(
                "control channel at {base}-{pid}.in / {base}-{pid}.out",
                pid = std::process::id()
            );
        }
    }

    if let Ok(specs) = env::var("FAILCAT_ENABLE") {
        for spec in specs.split(':').filter(|spec| !spec.is_empty()) {
            enable_spec(spec).with_context(|| format!("bad enable spec `{spec}`"))?;
        }
    }

    faultline::return_on!(
        "failcat/startup",
        Err(anyhow::anyhow!("injected startup failure"))
    );

    let mut buf = [0u8; BUF_SIZE];
    if faultline::fail("failcat/read") != 0 {
        anyhow::bail!(
            "injected read failure (failinfo {})",
            faultline::failinfo()
        );
    }
    let len = io::stdin().read(&mut buf).context("reading stdin")?;

    let mut pos = 0;
    while pos < len {
        if faultline::fail("failcat/write") != 0 {
            anyhow::bail!("injected write failure at offset {pos}");
        }
        let written = io::stdout()
            .write(&buf[pos..len])
            .context("writing stdout")?;
        if written == 0 {
            anyhow::bail!("stdout closed early");
        }
        pos += written;
    }
    Ok(())
}

/// Parses and applies one `name[,probability_percent[,failnum[,failinfo]]]`
/// spec. All fields but the name are optional.
fn enable_spec(spec: &str) -> Result<()> {
    let mut fields = spec.split(',');
    let name = fields
        .next()
        .filter(|name| !name.is_empty())
        .context("spec has no point name")?;
    let probability: f64 = fields.next().map(str::parse).transpose()?.unwrap_or(-1.0);
    let failnum: i32 = fields.next().map(str::parse).transpose()?.unwrap_or(1);
    let failinfo: usize = fields.next().map(str::parse).transpose()?.unwrap_or(0);

    if probability < 0.0 {
        faultline::enable(name, failnum, failinfo, PointFlags::empty())?;
        log::info!("enabled {name} (failnum {failnum})");
    } else {
        faultline::enable_random(
            name,
            failnum,
            failinfo,
            PointFlags::empty(),
            probability / 100.0,
        )?;
        log::info!("enabled {name} at {probability}% (failnum {failnum})");
    }
    Ok(())
}

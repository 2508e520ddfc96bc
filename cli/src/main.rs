use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use clap_num::maybe_hex;
use log::info;

use dabmux_core::edi::transport::{TcpSink, UdpSink};
use dabmux_core::edi::EdiContext;
use dabmux_core::input::file::FileReader;
use dabmux_core::input::tcp::TcpReader;
use dabmux_core::input::udp::UdpReader;
use dabmux_core::input::SubchannelReader;
use dabmux_core::model::{
    EnsembleBuilder, Language, ProtectionDescriptor, ProtectionForm, Service, ServiceComponent,
    SubchannelKind, TransmissionMode, TransportType,
};
use dabmux_core::scheduler::{EtiWriter, Output, Scheduler};

/// dabmux
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Ensemble id, decimal or hex (e.g. 0x4FFF).
    #[arg(long, value_parser = maybe_hex::<u16>, default_value = "0x4FFF")]
    eid: u16,

    /// Extended country code, decimal or hex.
    #[arg(long, value_parser = maybe_hex::<u8>, default_value = "0xE1")]
    ecc: u8,

    /// Ensemble label (<=16 EBU Latin characters).
    #[arg(long, default_value = "dabmux")]
    label: String,

    /// Transmission mode.
    #[arg(long, value_enum, default_value = "ii")]
    mode: Mode,

    /// Subchannel input: `<subchid>:file:<path>`, `<subchid>:udp:<bind addr>`
    /// or `<subchid>:tcp:<connect addr>`. Repeatable, one per subchannel.
    #[arg(long = "input", value_parser = parse_input)]
    inputs: Vec<InputSpec>,

    /// Write raw ETI octets to this file instead of emitting EDI.
    #[arg(long, conflicts_with_all = ["edi_udp", "edi_tcp_listen"])]
    eti_out: Option<PathBuf>,

    /// Send EDI PFT fragments as UDP datagrams to this destination.
    #[arg(long, conflicts_with = "edi_tcp_listen")]
    edi_udp: Option<SocketAddr>,

    /// Serve EDI PFT fragments to TCP clients connecting to this address.
    #[arg(long)]
    edi_tcp_listen: Option<String>,

    /// UDP/TCP output TTL.
    #[arg(long, default_value_t = 4)]
    ttl: u32,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Mode {
    I,
    Ii,
    Iii,
    Iv,
}

impl From<Mode> for TransmissionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::I => TransmissionMode::I,
            Mode::Ii => TransmissionMode::II,
            Mode::Iii => TransmissionMode::III,
            Mode::Iv => TransmissionMode::IV,
        }
    }
}

#[derive(Clone, Debug)]
struct InputSpec {
    subchid: u8,
    source: InputSource,
}

#[derive(Clone, Debug)]
enum InputSource {
    File(PathBuf),
    Udp(String),
    Tcp(String),
}

fn parse_input(s: &str) -> Result<InputSpec, String> {
    let mut parts = s.splitn(3, ':');
    let subchid = parts
        .next()
        .ok_or("missing subchid")?
        .parse::<u8>()
        .map_err(|e| e.to_string())?;
    let kind = parts.next().ok_or("missing input kind")?;
    let rest = parts.next().ok_or("missing input source")?;

    let source = match kind {
        "file" => InputSource::File(PathBuf::from(rest)),
        "udp" => InputSource::Udp(rest.to_string()),
        "tcp" => InputSource::Tcp(rest.to_string()),
        other => return Err(format!("unknown input kind {other:?}, expected file/udp/tcp")),
    };

    Ok(InputSpec { subchid, source })
}

/// Builds the sample ensemble this binary wires into the scheduler. A
/// real deployment would source this from YAML or another external
/// loader; that parsing is explicitly out of this crate's scope, so the
/// CLI only demonstrates the programmatic builder.
fn sample_ensemble(args: &Args) -> dabmux_core::Ensemble {
    let mut builder = EnsembleBuilder::new(args.eid, args.ecc, args.mode.into()).label(&args.label);

    for input in &args.inputs {
        builder = builder
            .with_service(Service {
                sid: input.subchid as u32 + 1,
                label: format!("Svc{}", input.subchid),
                short_label_mask: None,
                programme_type: 0,
                language: Language::Eng,
            })
            .with_component(ServiceComponent {
                sid: input.subchid as u32 + 1,
                subchid: input.subchid,
                transport: TransportType::StreamAudio,
                scids: 0,
                primary: true,
                label: None,
                user_applications: vec![],
                dynamic_label: false,
            })
            .with_subchannel(
                input.subchid,
                SubchannelKind::DabPlusAudio,
                64,
                ProtectionDescriptor {
                    form: ProtectionForm::EepA,
                    level: 3,
                },
            );
    }

    builder.build().expect("sample ensemble is self-consistent")
}

fn build_reader(spec: &InputSpec) -> anyhow::Result<Box<dyn SubchannelReader>> {
    Ok(match &spec.source {
        InputSource::File(path) => Box::new(FileReader::new(spec.subchid, path.clone())),
        InputSource::Udp(addr) => Box::new(UdpReader::new(spec.subchid, addr.parse()?)),
        InputSource::Tcp(addr) => Box::new(TcpReader::new(spec.subchid, addr.parse()?)),
    })
}

struct FileEtiWriter(tokio::fs::File);

#[async_trait::async_trait]
impl EtiWriter for FileEtiWriter {
    async fn write_frame(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.0.write_all(bytes).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp(None).init();

    let args = Args::parse();
    let ensemble = sample_ensemble(&args);
    let readers: Vec<Box<dyn SubchannelReader>> = args
        .inputs
        .iter()
        .map(build_reader)
        .collect::<anyhow::Result<_>>()?;

    let output = if let Some(path) = &args.eti_out {
        let file = tokio::fs::File::create(path).await?;
        Output::EtiFile(Box::new(FileEtiWriter(file)))
    } else if let Some(dest) = args.edi_udp {
        let sink = UdpSink::connect(dest, args.ttl).await?;
        Output::Edi {
            ctx: EdiContext::default(),
            sink: Box::new(sink),
        }
    } else if let Some(addr) = &args.edi_tcp_listen {
        let sink = TcpSink::bind(addr).await?;
        Output::Edi {
            ctx: EdiContext::default(),
            sink: Box::new(sink),
        }
    } else {
        anyhow::bail!("specify one of --eti-out, --edi-udp or --edi-tcp-listen");
    };

    let mut scheduler = Scheduler::new(ensemble, readers, output)?;
    scheduler.open_readers().await?;

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("stop signal received, finishing in-flight frame");
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
    });

    scheduler.run().await?;
    Ok(())
}

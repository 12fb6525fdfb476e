use std::fmt::Write as _;
use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lodestone::bencode::{decode, Value};
use lodestone::client::Client;
use lodestone::metainfo::{Info, MagnetLink, Metainfo};
use lodestone::peer::PeerConnection;

#[derive(Debug, Parser)]
#[command(name = "lodestone", version, about = "A minimal BitTorrent client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
#[clap(rename_all = "snake_case")]
enum Commands {
    /// Decode a bencoded value and print it as JSON-style text
    Decode { value: String },
    /// Show the metadata of a torrent file
    Info { file: PathBuf },
    /// List the peers the tracker returns for a torrent
    Peers { file: PathBuf },
    /// Handshake with a specific peer
    Handshake { file: PathBuf, peer: SocketAddrV4 },
    /// Download and verify a single piece
    DownloadPiece {
        #[arg(short)]
        output: PathBuf,
        file: PathBuf,
        piece: u32,
    },
    /// Download the whole file
    Download {
        #[arg(short)]
        output: PathBuf,
        file: PathBuf,
    },
    /// Parse a magnet link
    MagnetParse { link: String },
    /// Handshake with a peer from a magnet link, negotiating extensions
    MagnetHandshake { link: String },
    /// Fetch and show torrent metadata over a magnet session
    MagnetInfo { link: String },
    /// Download a single piece starting from a magnet link
    MagnetDownloadPiece {
        #[arg(short)]
        output: PathBuf,
        link: String,
        piece: u32,
    },
    /// Download the whole file starting from a magnet link
    MagnetDownload {
        #[arg(short)]
        output: PathBuf,
        link: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Decode { value } => {
            let decoded = decode(value.as_bytes()).context("decoding bencoded value")?;
            println!("{}", render(&decoded));
        }
        Commands::Info { file } => {
            let metainfo = read_metainfo(&file).await?;
            println!("Tracker URL: {}", metainfo.announce);
            println!("Length: {}", metainfo.info.length);
            println!("Info Hash: {}", metainfo.info_hash);
            print_pieces(&metainfo.info);
        }
        Commands::Peers { file } => {
            let metainfo = read_metainfo(&file).await?;
            let peers = client
                .announce(&metainfo.announce, &metainfo.info_hash, metainfo.info.length)
                .await
                .context("requesting peers from tracker")?;
            for peer in peers {
                println!("{peer}");
            }
        }
        Commands::Handshake { file, peer } => {
            let metainfo = read_metainfo(&file).await?;
            let conn = PeerConnection::connect(peer, &metainfo.info_hash, client.peer_id(), false)
                .await
                .context("handshaking with peer")?;
            println!("Peer ID: {}", conn.peer_id);
        }
        Commands::DownloadPiece {
            output,
            file,
            piece,
        } => {
            let metainfo = read_metainfo(&file).await?;
            let mut conn = client.connect(&metainfo).await?;
            conn.prepare_download().await?;

            let data = client.download_piece(&mut conn, &metainfo.info, piece).await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Piece {} downloaded to {}.", piece, output.display());
        }
        Commands::Download { output, file } => {
            let metainfo = read_metainfo(&file).await?;
            let mut conn = client.connect(&metainfo).await?;
            conn.prepare_download().await?;

            let data = client.download(&mut conn, &metainfo.info).await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Downloaded {} to {}.", file.display(), output.display());
        }
        Commands::MagnetParse { link } => {
            let magnet = MagnetLink::parse(&link)?;
            println!("Tracker URL: {}", magnet.tracker.as_deref().unwrap_or(""));
            println!("Info Hash: {}", magnet.info_hash);
        }
        Commands::MagnetHandshake { link } => {
            let magnet = MagnetLink::parse(&link)?;
            let conn = client.connect_magnet(&magnet).await?;
            println!("Peer ID: {}", conn.peer_id);
            if let Some(id) = conn.metadata_extension_id() {
                println!("Peer Metadata Extension ID: {id}");
            }
        }
        Commands::MagnetInfo { link } => {
            let magnet = MagnetLink::parse(&link)?;
            let mut conn = client.connect_magnet(&magnet).await?;
            let info = client.fetch_magnet_info(&mut conn, &magnet).await?;

            println!("Tracker URL: {}", magnet.tracker.as_deref().unwrap_or(""));
            println!("Length: {}", info.length);
            println!("Info Hash: {}", magnet.info_hash);
            print_pieces(&info);
        }
        Commands::MagnetDownloadPiece {
            output,
            link,
            piece,
        } => {
            let magnet = MagnetLink::parse(&link)?;
            let mut conn = client.connect_magnet(&magnet).await?;
            let info = client.fetch_magnet_info(&mut conn, &magnet).await?;
            conn.prepare_download().await?;

            let data = client.download_piece(&mut conn, &info, piece).await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Piece {} downloaded to {}.", piece, output.display());
        }
        Commands::MagnetDownload { output, link } => {
            let magnet = MagnetLink::parse(&link)?;
            let mut conn = client.connect_magnet(&magnet).await?;
            let info = client.fetch_magnet_info(&mut conn, &magnet).await?;
            conn.prepare_download().await?;

            let data = client.download(&mut conn, &info).await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Downloaded {} to {}.", link, output.display());
        }
    }

    Ok(())
}

async fn read_metainfo(path: &Path) -> Result<Metainfo> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Metainfo::from_bytes(&data).context("parsing torrent file")
}

fn print_pieces(info: &Info) {
    println!("Piece Length: {}", info.piece_length);
    println!("Piece Hashes:");
    for hash in &info.pieces {
        let mut line = String::with_capacity(40);
        for byte in hash {
            let _ = write!(line, "{byte:02x}");
        }
        println!("{line}");
    }
}

// JSON-style rendering of a decoded value. Byte strings are shown lossily;
// the in-memory value keeps its raw octets regardless.
fn render(value: &Value) -> String {
    let mut out = String::new();
    render_value(value, &mut out);
    out
}

fn render_value(value: &Value, out: &mut String) {
    match value {
        Value::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Bytes(b) => render_string(&String::from_utf8_lossy(b), out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_value(item, out);
            }
            out.push(']');
        }
        Value::Dict(dict) => {
            out.push('{');
            for (i, (key, val)) in dict.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_string(&String::from_utf8_lossy(key), out);
                out.push(':');
                render_value(val, out);
            }
            out.push('}');
        }
    }
}

fn render_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

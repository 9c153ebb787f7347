//! Client connection driver
//!
//! Establishes the TCP connection, runs the registration/readiness
//! handshake, then hands inbound traffic to the printer task while the
//! console loop forwards typed lines to the relay.

use linechat_core::protocol::tokens;
use linechat_core::TimingConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::Args;
use crate::error::{ClientError, ClientResult};
use crate::printer::Printer;

/// Connect, register, and chat until quit or disconnect.
pub async fn run(args: Args) -> ClientResult<()> {
    let stream = TcpStream::connect((args.host.as_str(), args.port)).await?;
    debug!(host = args.host.as_str(), port = args.port, "connected to relay");
    println!("Connected!");

    let (read_half, write_half) = stream.into_split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(run_writer(write_half, outbox_rx));

    let mut server_lines = BufReader::new(read_half).lines();
    let mut console = BufReader::new(tokio::io::stdin()).lines();

    // Registration: propose names until one is accepted.
    let mut proposal = args.name;
    loop {
        let name = match proposal.take() {
            Some(name) => name,
            None => {
                println!("Please enter your name:");
                console.next_line().await?.ok_or(ClientError::InputClosed)?
            }
        };
        if outbox.send(name).is_err() {
            return Err(ClientError::ConnectionClosed);
        }

        let reply = server_lines
            .next_line()
            .await?
            .ok_or(ClientError::ConnectionClosed)?;
        match reply.as_str() {
            tokens::NAME_ACCEPTED => break,
            tokens::NAME_TAKEN => println!("Name taken!"),
            _ => return Err(ClientError::UnexpectedReply(reply)),
        }
    }

    // Confirm readiness; the relay now counts this session as active.
    outbox
        .send(tokens::READY.to_string())
        .map_err(|_| ClientError::ConnectionClosed)?;

    let printer = Printer::new(
        server_lines,
        outbox.clone(),
        TimingConfig::default().heartbeat_period(),
    );
    let mut printer_task = tokio::spawn(printer.run());

    // Console loop: typed lines go to the relay until the printer ends
    // (quit acknowledged or connection lost) or stdin closes.
    loop {
        tokio::select! {
            _ = &mut printer_task => break,
            line = console.next_line() => match line? {
                Some(line) => {
                    if outbox.send(line).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    printer_task.abort();
    drop(outbox);
    let _ = writer.await;
    Ok(())
}

/// Drain the outbox onto the socket, one line per message.
async fn run_writer(write_half: OwnedWriteHalf, mut outbox: mpsc::UnboundedReceiver<String>) {
    let mut writer = BufWriter::new(write_half);
    while let Some(line) = outbox.recv().await {
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
}

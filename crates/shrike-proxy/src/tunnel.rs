use crate::route::ProxyRoute;
use crate::{Error, Result};
use std::io::ErrorKind;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// One browser connection relayed to the upstream proxy.
///
/// The initial request header block is buffered whole, rewritten with
/// `Proxy-Authorization` if the route carries credentials, and forwarded
/// as one unit. Every byte after that is relayed unmodified in both
/// directions until either side closes.
pub(crate) async fn run(client: TcpStream, route: &ProxyRoute) -> Result<()> {
    let peer = client.peer_addr()?;

    let mut upstream = TcpStream::connect((route.host(), route.port()))
        .await
        .map_err(Error::Upstream)?;

    let mut client = BufReader::new(client);
    let header = read_header_block(&mut client).await?;
    tracing::trace!(%peer, request = %first_line(&header), "tunnel opened");

    let header = match route.basic_auth() {
        Some(auth) => inject_proxy_auth(&header, &auth)?,
        None => header,
    };
    upstream.write_all(&header).await?;

    // The client may have pipelined body bytes behind its header block;
    // they are already sitting in our read buffer and must go out first.
    let buffered = client.buffer().to_vec();
    if !buffered.is_empty() {
        upstream.write_all(&buffered).await?;
        client.consume(buffered.len());
    }

    let mut client = client.into_inner();
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((to_upstream, to_client)) => {
            tracing::debug!(%peer, to_upstream, to_client, "tunnel closed");
        }
        Err(e) if matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::BrokenPipe) => {
            tracing::debug!(%peer, error = %e, "tunnel peer dropped");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Read lines up to and including the blank-line terminator, or to EOF.
async fn read_header_block<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut block = Vec::new();
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        block.extend_from_slice(&line);
        if line == b"\r\n" || line == b"\n" {
            break;
        }
    }
    Ok(block)
}

/// Re-serialize a header block with `Proxy-Authorization` appended before
/// the blank-line terminator.
fn inject_proxy_auth(block: &[u8], auth: &str) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(block).map_err(|_| Error::MalformedHeader)?;

    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut out = String::new();
    for line in &lines {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str("Proxy-Authorization: ");
    out.push_str(auth);
    out.push_str("\r\n\r\n");
    Ok(out.into_bytes())
}

fn first_line(block: &[u8]) -> String {
    String::from_utf8_lossy(block)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

//! 数据面 TCP 服务
//!
//! 监听原始 TCP 端口。每个连接注册为数据面客户端，拥有一个有界发送队列；
//! 广播的帧按原样写出，客户端发来的字节只记录日志后丢弃。

use bytes::Bytes;
use cwsim_config::AppConfig;
use cwsim_protocol::render_frame;
use cwsim_transmit::{TransportError, Transmitter};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// 数据面监听器
#[derive(Clone)]
pub struct DataPlane {
    transmitter: Transmitter,
    /// 每个客户端最多排队的帧数
    buffer: usize,
    write_timeout: Option<Duration>,
}

impl DataPlane {
    pub fn new(transmitter: Transmitter, config: &AppConfig) -> Self {
        Self {
            transmitter,
            buffer: config.data_buffer,
            write_timeout: config.data_write_timeout,
        }
    }

    /// 接受连接直到任务被取消。
    pub async fn run(self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!(target: "cwsim.data", addr = %addr, "data plane listening");
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let plane = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = plane.handle_connection(stream, peer_addr.to_string()).await
                        {
                            warn!(target: "cwsim.data", peer = %peer_addr, error = %e, "data client dropped");
                        }
                    });
                }
                Err(e) => {
                    error!(target: "cwsim.data", error = %e, "failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: String,
    ) -> Result<(), TransportError> {
        let (frames, mut queue) = mpsc::channel::<Bytes>(self.buffer);
        let client = self.transmitter.open_data_client(Arc::new(frames), &peer);

        let result = pump(stream, &peer, &mut queue, self.write_timeout).await;
        self.transmitter.close(client);
        result
    }
}

/// 写出排队的帧，同时读取并丢弃入站字节。EOF、读写错误或被注册表移除时返回。
async fn pump(
    mut stream: TcpStream,
    peer: &str,
    queue: &mut mpsc::Receiver<Bytes>,
    write_timeout: Option<Duration>,
) -> Result<(), TransportError> {
    let (mut reader, mut writer) = stream.split();
    let mut buf = [0u8; 1024];

    loop {
        tokio::select! {
            frame = queue.recv() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                write_frame(&mut writer, &frame, write_timeout).await?;
            }
            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    info!(target: "cwsim.data", peer = %peer, "connection closed by peer");
                    return Ok(());
                }
                debug!(
                    target: "cwsim.data",
                    peer = %peer,
                    bytes = n,
                    data = %render_frame(&buf[..n]),
                    "inbound data discarded"
                );
            }
        }
    }
}

async fn write_frame<W>(
    writer: &mut W,
    frame: &[u8],
    write_timeout: Option<Duration>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    match write_timeout {
        Some(limit) => tokio::time::timeout(limit, writer.write_all(frame))
            .await
            .map_err(|_| TransportError::Timeout)??,
        None => writer.write_all(frame).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_frame_passes_bytes_through() {
        let mut out = Vec::new();
        write_frame(&mut out, b"\x021234\x03", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(out, b"\x021234\x03");
    }
}

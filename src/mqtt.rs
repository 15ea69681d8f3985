//! MQTT 3.1.1 session over a byte stream.
//!
//! Packets are encoded and decoded with `mqttrs`; this module only moves them
//! across the stream and checks the broker's acknowledgements. The firmware
//! runs it over a UART wired to a transparent serial-to-TCP bridge that holds
//! the socket to the broker.

use core::fmt;

use embedded_io::{Read, ReadExactError, Write};
use mqttrs::{
    decode_slice, encode_slice, Connect, ConnectReturnCode, Packet, Pid, Protocol, Publish,
    QosPid,
};

use crate::config::MqttConfig;
use crate::publish::{Broker, QoS};

/// Largest packet the client sends
pub const PACKET_BUFFER: usize = 256;
/// Acknowledgements are four bytes, anything longer is not one
const ACK_BUFFER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MqttError<E> {
    /// The stream failed
    Io(E),
    /// The stream closed mid-packet
    UnexpectedEof,
    /// CONNACK carried a non-zero return code
    Refused,
    /// The broker sent something other than the expected acknowledgement
    Protocol,
    /// The packet does not fit the send buffer
    TooLong,
}

impl<E> From<ReadExactError<E>> for MqttError<E> {
    fn from(e: ReadExactError<E>) -> Self {
        match e {
            ReadExactError::UnexpectedEof => MqttError::UnexpectedEof,
            ReadExactError::Other(e) => MqttError::Io(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for MqttError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::Io(e) => write!(f, "stream error: {:?}", e),
            MqttError::UnexpectedEof => f.write_str("stream closed"),
            MqttError::Refused => f.write_str("connection refused by broker"),
            MqttError::Protocol => f.write_str("unexpected packet from broker"),
            MqttError::TooLong => write!(f, "packet longer than {} bytes", PACKET_BUFFER),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for MqttError<E> {}

/// MQTT session over a byte stream.
pub struct MqttClient<'a, S> {
    stream: S,
    config: MqttConfig<'a>,
    next_pid: Pid,
}

impl<'a, S> MqttClient<'a, S>
where
    S: Read + Write,
{
    pub fn new(stream: S, config: MqttConfig<'a>) -> Self {
        Self {
            stream,
            config,
            next_pid: Pid::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn send(&mut self, packet: &Packet<'_>) -> Result<(), MqttError<S::Error>> {
        let mut buf = [0u8; PACKET_BUFFER];
        let len = encode_slice(packet, &mut buf).map_err(|_| MqttError::TooLong)?;
        self.stream.write_all(&buf[..len]).map_err(MqttError::Io)?;
        self.stream.flush().map_err(MqttError::Io)
    }

    /// Reads one acknowledgement and lets `accept` pick what it needs from
    /// it, `None` meaning the broker sent the wrong packet.
    fn receive<T>(
        &mut self,
        accept: impl FnOnce(&Packet<'_>) -> Option<T>,
    ) -> Result<T, MqttError<S::Error>> {
        let mut buf = [0u8; ACK_BUFFER];
        for len in 1..=ACK_BUFFER {
            self.stream.read_exact(&mut buf[len - 1..len])?;
            match decode_slice(&buf[..len]) {
                Ok(Some(packet)) => return accept(&packet).ok_or(MqttError::Protocol),
                Ok(None) => {}
                Err(_) => break,
            }
        }
        warn!("Undecodable packet from broker");
        Err(MqttError::Protocol)
    }
}

impl<'a, S> Broker for MqttClient<'a, S>
where
    S: Read + Write,
{
    type Error = MqttError<S::Error>;

    fn connect(&mut self) -> Result<(), Self::Error> {
        let username = Some(self.config.username).filter(|name| !name.is_empty());
        // A password is only allowed together with a user name
        let password = Some(self.config.password.as_bytes()).filter(|pw| !pw.is_empty());
        let password = username.and(password);
        self.send(&Packet::Connect(Connect {
            protocol: Protocol::MQTT311,
            keep_alive: self.config.keep_alive_secs,
            client_id: self.config.client_id,
            clean_session: true,
            last_will: None,
            username,
            password,
        }))?;

        let accepted = self.receive(|packet| match packet {
            Packet::Connack(ack) => Some(ack.code == ConnectReturnCode::Accepted),
            _ => None,
        })?;
        if !accepted {
            warn!("Broker refused connection");
            return Err(MqttError::Refused);
        }
        debug!("Connected as {}", self.config.client_id);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Self::Error> {
        let pid = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce => {
                let pid = self.next_pid;
                self.next_pid = pid + 1;
                Some(pid)
            }
        };
        self.send(&Packet::Publish(Publish {
            dup: false,
            qospid: pid.map_or(QosPid::AtMostOnce, QosPid::AtLeastOnce),
            retain: false,
            topic_name: topic,
            payload,
        }))?;

        if let Some(pid) = pid {
            let acked = self.receive(|packet| match packet {
                Packet::Puback(acked) => Some(*acked),
                _ => None,
            })?;
            if acked != pid {
                warn!("PUBACK for {=u16}, expected {=u16}", acked.get(), pid.get());
                return Err(MqttError::Protocol);
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.send(&Packet::Disconnect)
    }
}

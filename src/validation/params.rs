use crate::core::config::AnnounceConfig;
use crate::core::error::ValidationError;
use crate::models::announce::AnnounceRequest;
use crate::models::peer::{AnnounceEvent, InfoHash, PeerId};
use crate::utils::query::parse_query;
use std::net::IpAddr;
use std::num::IntErrorKind;

/// Raw announce parameters, percent-decoded but otherwise unchecked
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnnounceParams {
    /// Opaque torrent identifier, usually 20 bytes
    pub info_hash: Option<Vec<u8>>,

    /// Opaque client identifier, usually 20 bytes
    pub peer_id: Option<Vec<u8>>,

    /// Port number (0-65535)
    pub port: Option<Vec<u8>>,

    /// Bytes uploaded
    pub uploaded: Option<Vec<u8>>,

    /// Bytes downloaded
    pub downloaded: Option<Vec<u8>>,

    /// Bytes left to download
    pub left: Option<Vec<u8>>,

    /// "started", "stopped", "completed", or empty
    pub event: Option<Vec<u8>>,

    /// Number of peers wanted
    pub numwant: Option<Vec<u8>>,

    /// Compact mode (0 or 1, default 0)
    pub compact: Option<Vec<u8>>,

    /// Omit peer ids from dictionary peers (0 or 1, default 0)
    pub no_peer_id: Option<Vec<u8>>,

    /// Optional IP address override
    pub ip: Option<Vec<u8>>,
}

impl AnnounceParams {
    /// Collect the announce keys from a raw query string.
    ///
    /// Unknown keys are ignored; for repeated keys the last one wins.
    pub fn from_query(raw: &str) -> Result<Self, ValidationError> {
        let mut params = Self::default();

        for (key, value) in parse_query(raw)? {
            let slot = match key.as_slice() {
                b"info_hash" => &mut params.info_hash,
                b"peer_id" => &mut params.peer_id,
                b"port" => &mut params.port,
                b"uploaded" => &mut params.uploaded,
                b"downloaded" => &mut params.downloaded,
                b"left" => &mut params.left,
                b"event" => &mut params.event,
                b"numwant" => &mut params.numwant,
                b"compact" => &mut params.compact,
                b"no_peer_id" => &mut params.no_peer_id,
                b"ip" => &mut params.ip,
                _ => continue,
            };

            *slot = Some(value);
        }

        Ok(params)
    }

    /// Check every field and build the request the processor works with.
    ///
    /// `observed_ip` is the connection's source address, used when the query
    /// carries no `ip`.
    pub fn validate(
        &self,
        config: &AnnounceConfig,
        observed_ip: IpAddr,
    ) -> Result<AnnounceRequest, ValidationError> {
        let info_hash = InfoHash(required_bytes(&self.info_hash, "info_hash")?);
        let peer_id = PeerId(required_bytes(&self.peer_id, "peer_id")?);
        let port = self.validate_port()?;
        let uploaded = required_u64(&self.uploaded, "uploaded")?;
        let downloaded = required_u64(&self.downloaded, "downloaded")?;
        let left = required_u64(&self.left, "left")?;
        let event = self.validate_event()?;
        let numwant = self.validate_numwant(config)?;
        let (compact, no_peer_id) = self.response_shape()?;
        let ip = self.validate_ip()?.unwrap_or(observed_ip).to_canonical();

        Ok(AnnounceRequest {
            info_hash,
            peer_id,
            ip,
            port,
            uploaded,
            downloaded,
            left,
            event,
            numwant,
            compact,
            no_peer_id,
        })
    }

    /// `compact` and `no_peer_id`, which only shape the encoded response
    pub fn response_shape(&self) -> Result<(bool, bool), ValidationError> {
        Ok((
            flag(&self.compact, "compact")?,
            flag(&self.no_peer_id, "no_peer_id")?,
        ))
    }

    fn validate_port(&self) -> Result<u16, ValidationError> {
        let raw = self.port.as_deref().ok_or(ValidationError::MissingParameter("port"))?;
        let text = as_text(raw, "port")?;

        text.parse::<u16>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => {
                ValidationError::OutOfRange(format!("port {} is not in 0-65535", text))
            }
            _ => ValidationError::InvalidFormat(format!("port '{}' is not an integer", text)),
        })
    }

    fn validate_event(&self) -> Result<AnnounceEvent, ValidationError> {
        match self.event.as_deref() {
            None | Some(b"") | Some(b"empty") => Ok(AnnounceEvent::None),
            Some(b"started") => Ok(AnnounceEvent::Started),
            Some(b"stopped") => Ok(AnnounceEvent::Stopped),
            // Some clients send the noun instead of the past tense
            Some(b"completed") | Some(b"complete") => Ok(AnnounceEvent::Completed),
            Some(other) => Err(ValidationError::InvalidFormat(format!(
                "event '{}' must be 'started', 'stopped', 'completed', or empty",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Missing means the configured default; anything above the cap is cut down to it
    fn validate_numwant(&self, config: &AnnounceConfig) -> Result<usize, ValidationError> {
        let requested = match self.numwant.as_deref() {
            None | Some(b"") => config.default_numwant,
            Some(raw) => {
                let text = as_text(raw, "numwant")?;
                match text.parse::<u64>() {
                    Ok(n) => usize::try_from(n).unwrap_or(usize::MAX),
                    Err(e) if *e.kind() == IntErrorKind::PosOverflow => usize::MAX,
                    Err(_) => {
                        return Err(ValidationError::InvalidFormat(format!(
                            "numwant '{}' is not a non-negative integer",
                            text
                        )))
                    }
                }
            }
        };

        Ok(requested.min(config.max_numwant))
    }

    fn validate_ip(&self) -> Result<Option<IpAddr>, ValidationError> {
        match self.ip.as_deref() {
            None | Some(b"") => Ok(None),
            Some(raw) => {
                let text = as_text(raw, "ip")?;
                text.parse::<IpAddr>().map(Some).map_err(|_| {
                    ValidationError::InvalidFormat(format!("ip '{}' is not an IP address", text))
                })
            }
        }
    }
}

fn required_bytes(field: &Option<Vec<u8>>, name: &'static str) -> Result<Vec<u8>, ValidationError> {
    match field {
        Some(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
        _ => Err(ValidationError::MissingParameter(name)),
    }
}

fn required_u64(field: &Option<Vec<u8>>, name: &'static str) -> Result<u64, ValidationError> {
    let raw = field.as_deref().ok_or(ValidationError::MissingParameter(name))?;
    let text = as_text(raw, name)?;

    text.parse::<u64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => ValidationError::OutOfRange(format!("{} is too large", name)),
        _ => ValidationError::InvalidFormat(format!(
            "{} '{}' is not a non-negative integer",
            name, text
        )),
    })
}

fn flag(field: &Option<Vec<u8>>, name: &'static str) -> Result<bool, ValidationError> {
    match field.as_deref() {
        None | Some(b"") | Some(b"0") => Ok(false),
        Some(b"1") => Ok(true),
        Some(other) => Err(ValidationError::InvalidFormat(format!(
            "{} must be 0 or 1, got '{}'",
            name,
            String::from_utf8_lossy(other)
        ))),
    }
}

fn as_text<'a>(raw: &'a [u8], name: &'static str) -> Result<&'a str, ValidationError> {
    std::str::from_utf8(raw)
        .map_err(|_| ValidationError::InvalidEncoding(format!("{} is not valid UTF-8", name)))
}

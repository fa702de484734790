use strum::{Display, EnumIter};

pub const DEFAULT_TCP_HOST: &str = "localhost";
pub const DEFAULT_TCP_PORT: u16 = 4403;

/// Some platforms hide peripheral MAC addresses and report this for every peer.
pub const NIL_BLE_ADDRESS: &str = "00:00:00:00:00:00";

/// The medium used to reach a radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Transport {
    #[strum(serialize = "Serial/USB")]
    Serial,
    #[strum(serialize = "Bluetooth")]
    Ble,
    #[strum(serialize = "TCP Link")]
    Tcp,
}

/// How a Bluetooth radio is looked up when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleLookup {
    MacAddress(String),
    Name(String),
}

impl BleLookup {
    /// A hidden (nil or empty) address falls back to the advertised name.
    pub fn resolve(address: &str, name: Option<&str>) -> Self {
        let hidden = address.is_empty() || address == NIL_BLE_ADDRESS;
        match name.filter(|name| !name.is_empty()) {
            Some(name) if hidden => Self::Name(name.to_string()),
            _ => Self::MacAddress(address.to_string()),
        }
    }
}

/// Everything needed to open a connection to one radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Serial { port: String },
    Ble { address: String, name: Option<String> },
    Tcp { host: String, port: u16 },
}

impl ConnectionTarget {
    pub fn serial(port: impl Into<String>) -> Self {
        Self::Serial { port: port.into() }
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Serial { .. } => Transport::Serial,
            Self::Ble { .. } => Transport::Ble,
            Self::Tcp { .. } => Transport::Tcp,
        }
    }

    /// Address as shown to the user: port path, Bluetooth address or `host:port`.
    pub fn address(&self) -> String {
        match self {
            Self::Serial { port } => port.clone(),
            Self::Ble { address, name } => match BleLookup::resolve(address, name.as_deref()) {
                BleLookup::MacAddress(address) | BleLookup::Name(address) => address,
            },
            Self::Tcp { host, port } => format!("{host}:{port}"),
        }
    }

    /// Registry key, unique per transport and address.
    pub fn key(&self) -> String {
        let scheme = match self.transport() {
            Transport::Serial => "serial",
            Transport::Ble => "ble",
            Transport::Tcp => "tcp",
        };
        format!("{scheme}:{address}", address = self.address())
    }
}

use std::collections::HashMap;

/// Cached device state from received packets
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub my_node_info: Option<MyNodeInfo>,
    pub nodes: HashMap<u32, NodeInfo>,
    pub channels: Vec<ChannelInfo>,
    pub metadata: Option<DeviceMetadata>,
    pub lora: Option<LoraSummary>,
    pub device_metrics: Option<DeviceMetrics>,
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: String,
    pub num: u32,
    pub user: User,
    pub last_heard: Option<u64>,
    pub snr: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: String,
    pub long_name: String,
    pub short_name: String,
    pub hw_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub index: u32,
    pub name: String,
    pub role: String,
    pub has_psk: bool,
}

#[derive(Debug, Clone)]
pub struct MyNodeInfo {
    pub node_num: u32,
    pub node_id: String,
    pub reboot_count: u32,
    pub min_app_version: u32,
    pub device_id: String,
}

#[derive(Debug, Clone)]
pub struct DeviceMetadata {
    pub firmware_version: String,
    pub hw_model: String,
    pub has_bluetooth: bool,
    pub has_wifi: bool,
    pub has_ethernet: bool,
}

#[derive(Debug, Clone)]
pub struct LoraSummary {
    pub region: String,
    pub modem_preset: String,
    pub hop_limit: u32,
    pub tx_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct DeviceMetrics {
    pub battery_level: Option<u32>,
    pub voltage: Option<f32>,
    pub channel_utilization: Option<f32>,
    pub air_util_tx: Option<f32>,
    pub uptime_seconds: Option<u32>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_node(&mut self, node_num: u32, node_info: NodeInfo) {
        self.nodes.insert(node_num, node_info);
    }

    pub fn update_channel(&mut self, channel: ChannelInfo) {
        if let Some(existing) = self.channels.iter_mut().find(|c| c.index == channel.index) {
            *existing = channel;
        } else {
            self.channels.push(channel);
        }
    }

    pub fn set_my_node_info(&mut self, info: MyNodeInfo) {
        self.my_node_info = Some(info);
    }

    pub fn set_metadata(&mut self, metadata: DeviceMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn set_lora(&mut self, lora: LoraSummary) {
        self.lora = Some(lora);
    }

    pub fn set_device_metrics(&mut self, metrics: DeviceMetrics) {
        self.device_metrics = Some(metrics);
    }

    /// The node entry of the radio we are connected to, once both
    /// `MyNodeInfo` and its `NodeInfo` have arrived.
    pub fn my_node(&self) -> Option<&NodeInfo> {
        let num = self.my_node_info.as_ref()?.node_num;
        self.nodes.get(&num)
    }

    pub fn short_name(&self) -> Option<&str> {
        self.my_node()
            .map(|n| n.user.short_name.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn long_name(&self) -> Option<&str> {
        self.my_node()
            .map(|n| n.user.long_name.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Nodes heard by this radio, most recently heard first.
    pub fn nodes_by_last_heard(&self) -> Vec<&NodeInfo> {
        let mut nodes: Vec<&NodeInfo> = self.nodes.values().collect();
        nodes.sort_by(|a, b| b.last_heard.cmp(&a.last_heard).then(a.num.cmp(&b.num)));
        nodes
    }

    /// Label/value pairs for the device summary view.
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        let unknown = || "Unknown".to_string();
        let mut rows = vec![
            ("Long Name", self.long_name().map(str::to_string).unwrap_or_else(unknown)),
            ("Short Name", self.short_name().map(str::to_string).unwrap_or_else(unknown)),
            (
                "Node ID",
                self.my_node_info
                    .as_ref()
                    .map(|i| format!("!{id}", id = i.node_id))
                    .unwrap_or_else(unknown),
            ),
            (
                "Hardware",
                self.my_node()
                    .and_then(|n| n.user.hw_model.clone())
                    .or_else(|| self.metadata.as_ref().map(|m| m.hw_model.clone()))
                    .unwrap_or_else(unknown),
            ),
            (
                "Firmware",
                self.metadata
                    .as_ref()
                    .map(|m| m.firmware_version.clone())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(unknown),
            ),
        ];

        if let Some(lora) = &self.lora {
            rows.push(("Region", lora.region.clone()));
            rows.push(("Modem Preset", lora.modem_preset.clone()));
        }

        if let Some(battery) = self.device_metrics.as_ref().and_then(|m| m.battery_level) {
            // Firmware reports values above 100 when running on external power.
            let value = if battery > 100 {
                "Powered".to_string()
            } else {
                format!("{battery}%")
            };
            rows.push(("Battery", value));
        }

        if let Some(info) = &self.my_node_info {
            rows.push(("Reboot Count", info.reboot_count.to_string()));
        }

        rows.push(("Channels", self.channels.len().to_string()));
        rows.push(("Known Nodes", self.nodes.len().to_string()));
        rows
    }
}

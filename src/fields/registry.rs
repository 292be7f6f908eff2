//! Declarative field registry.
//!
//! Every recognised vendor signal is described once here: its dotted path,
//! display labels, semantic group, value type, formatter, and (for risk
//! signals) the weight it contributes to the composite score. Consumers query
//! the table by key or by group and never hard-code per-field logic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use super::format::Formatter;

/// Semantic bucket a field is displayed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldGroup {
    Identity,
    Device,
    Network,
    RiskDetection,
    Browser,
    System,
    AdvancedDetection,
    Other,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 8] = [
        FieldGroup::Identity,
        FieldGroup::Device,
        FieldGroup::Network,
        FieldGroup::RiskDetection,
        FieldGroup::Browser,
        FieldGroup::System,
        FieldGroup::AdvancedDetection,
        FieldGroup::Other,
    ];

    /// Display label used by the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            FieldGroup::Identity => "基础信息",
            FieldGroup::Device => "设备信息",
            FieldGroup::Network => "网络信息",
            FieldGroup::RiskDetection => "风险检测",
            FieldGroup::Browser => "浏览器信息",
            FieldGroup::System => "系统信息",
            FieldGroup::AdvancedDetection => "高级检测",
            FieldGroup::Other => "其他信息",
        }
    }
}

impl std::fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Rendering hint for a field's value. Not validated against the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    Url,
    IpAddress,
    Score,
    ConfidenceRatio,
}

/// Static display and scoring metadata for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub label_en: Option<&'static str>,
    pub description: Option<&'static str>,
    pub group: FieldGroup,
    pub value_type: ValueType,
    pub critical: bool,
    pub risk_weight: Option<u32>,
    pub copyable: bool,
    pub hide_empty: bool,
    pub icon: Option<&'static str>,
    pub formatter: Option<Formatter>,
}

impl FieldDescriptor {
    pub fn new(
        key: &'static str,
        label: &'static str,
        group: FieldGroup,
        value_type: ValueType,
    ) -> Self {
        Self {
            key,
            label,
            label_en: None,
            description: None,
            group,
            value_type,
            critical: false,
            risk_weight: None,
            copyable: false,
            hide_empty: false,
            icon: None,
            formatter: None,
        }
    }

    pub fn with_label_en(mut self, label_en: &'static str) -> Self {
        self.label_en = Some(label_en);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_risk_weight(mut self, weight: u32) -> Self {
        self.risk_weight = Some(weight);
        self
    }

    pub fn as_critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn as_copyable(mut self) -> Self {
        self.copyable = true;
        self
    }

    pub fn hiding_empty(mut self) -> Self {
        self.hide_empty = true;
        self
    }

    /// Weight this field contributes when triggered, if it participates in
    /// scoring at all. A zero weight counts as not participating.
    pub fn weight(&self) -> Option<u32> {
        self.risk_weight.filter(|weight| *weight > 0)
    }

    pub fn is_risk_weighted(&self) -> bool {
        self.weight().is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("field key `{0}` is not a valid dotted path")]
    InvalidKey(String),
    #[error("field key `{0}` is registered more than once")]
    DuplicateKey(String),
}

/// Dotted path grammar: identifier segments, numeric segments allowed after
/// the first one for array indices.
static KEY_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$")
        .unwrap_or_else(|err| panic!("invalid field key grammar: {}", err))
});

static BUILTIN: Lazy<FieldRegistry> = Lazy::new(|| {
    FieldRegistry::from_descriptors(builtin_fields())
        .unwrap_or_else(|err| panic!("invalid builtin field registry: {}", err))
});

/// Read-only, ordered field table with key lookup.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl FieldRegistry {
    /// Build a registry, rejecting malformed or duplicate keys.
    pub fn from_descriptors(fields: Vec<FieldDescriptor>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if !KEY_GRAMMAR.is_match(field.key) {
                return Err(RegistryError::InvalidKey(field.key.to_string()));
            }
            if index.insert(field.key, position).is_some() {
                return Err(RegistryError::DuplicateKey(field.key.to_string()));
            }
        }

        log::debug!("field registry loaded with {} descriptors", fields.len());
        Ok(Self { fields, index })
    }

    /// The process-wide registry of vendor fields.
    pub fn builtin() -> &'static FieldRegistry {
        &BUILTIN
    }

    pub fn lookup(&self, key: &str) -> Option<&FieldDescriptor> {
        self.index.get(key).map(|position| &self.fields[*position])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Descriptors in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn by_group(&self, group: FieldGroup) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|field| field.group == group).collect()
    }

    pub fn critical(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|field| field.critical).collect()
    }

    pub fn risk_weighted(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter().filter(|field| field.is_risk_weighted())
    }

    /// Groups that have at least one field, in first-appearance order.
    pub fn groups(&self) -> Vec<FieldGroup> {
        let mut groups = Vec::new();
        for field in &self.fields {
            if !groups.contains(&field.group) {
                groups.push(field.group);
            }
        }
        groups
    }
}

/// Look up a built-in descriptor by its dotted key.
pub fn lookup(key: &str) -> Option<&'static FieldDescriptor> {
    FieldRegistry::builtin().lookup(key)
}

pub fn list_by_group(group: FieldGroup) -> Vec<&'static FieldDescriptor> {
    FieldRegistry::builtin().by_group(group)
}

pub fn list_critical() -> Vec<&'static FieldDescriptor> {
    FieldRegistry::builtin().critical()
}

pub fn list_risk_weighted() -> Vec<&'static FieldDescriptor> {
    FieldRegistry::builtin().risk_weighted().collect()
}

fn builtin_fields() -> Vec<FieldDescriptor> {
    use FieldGroup::*;
    use Formatter as F;

    vec![
        // Identity
        FieldDescriptor::new("visitorId", "访问者ID", Identity, ValueType::String)
            .with_label_en("Visitor ID")
            .with_description("唯一标识访问者的永久ID")
            .with_icon("user")
            .as_critical()
            .as_copyable(),
        FieldDescriptor::new("requestId", "请求ID", Identity, ValueType::String)
            .with_label_en("Request ID")
            .with_description("当前请求的唯一标识符")
            .with_icon("hash")
            .as_copyable(),
        FieldDescriptor::new("confidence.score", "识别置信度", Identity, ValueType::ConfidenceRatio)
            .with_label_en("Confidence Score")
            .with_description("访问者识别的准确度评分")
            .with_icon("star")
            .with_formatter(F::Confidence)
            .as_critical(),
        FieldDescriptor::new("visitorFound", "已知访问者", Identity, ValueType::Boolean)
            .with_label_en("Visitor Found")
            .with_description("是否为已知的访问者")
            .with_icon("search")
            .with_formatter(F::Boolean),
        FieldDescriptor::new("firstSeenAt.global", "首次访问时间", Identity, ValueType::Date)
            .with_label_en("First Seen At")
            .with_description("全局范围内首次检测到该访问者的时间")
            .with_icon("calendar")
            .with_formatter(F::Timestamp),
        FieldDescriptor::new("lastSeenAt.global", "最近访问时间", Identity, ValueType::Date)
            .with_label_en("Last Seen At")
            .with_description("全局范围内最近一次检测到该访问者的时间")
            .with_icon("clock")
            .with_formatter(F::Timestamp),
        // Network
        FieldDescriptor::new("ip", "IP地址", Network, ValueType::IpAddress)
            .with_label_en("IP Address")
            .with_description("访问者的IP地址")
            .with_icon("globe")
            .as_critical()
            .as_copyable(),
        FieldDescriptor::new("ipLocation.country.name", "国家", Network, ValueType::String)
            .with_label_en("Country")
            .with_description("IP地址对应的国家")
            .with_icon("flag")
            .as_critical()
            .as_copyable(),
        FieldDescriptor::new("ipLocation.country.code", "国家代码", Network, ValueType::String)
            .with_label_en("Country Code")
            .with_description("ISO 3166-1 alpha-2 国家代码")
            .with_icon("flag")
            .as_copyable(),
        FieldDescriptor::new("ipLocation.subdivisions.0.name", "地区", Network, ValueType::String)
            .with_label_en("Region")
            .with_description("IP地址对应的一级行政区")
            .with_icon("map-pin")
            .as_copyable()
            .hiding_empty(),
        FieldDescriptor::new("ipLocation.city.name", "城市", Network, ValueType::String)
            .with_label_en("City")
            .with_description("IP地址对应的城市")
            .with_icon("map-pin")
            .as_copyable(),
        FieldDescriptor::new("ipLocation.latitude", "纬度", Network, ValueType::Number)
            .with_label_en("Latitude")
            .with_description("IP地址对应的地理纬度")
            .with_icon("navigation")
            .with_formatter(F::Coordinate),
        FieldDescriptor::new("ipLocation.longitude", "经度", Network, ValueType::Number)
            .with_label_en("Longitude")
            .with_description("IP地址对应的地理经度")
            .with_icon("navigation")
            .with_formatter(F::Coordinate),
        FieldDescriptor::new("ipLocation.timezone", "时区", Network, ValueType::String)
            .with_label_en("Timezone")
            .with_description("IP地址对应的时区")
            .with_icon("clock")
            .as_copyable(),
        FieldDescriptor::new("ipLocation.accuracyRadius", "定位精度半径", Network, ValueType::Number)
            .with_label_en("Accuracy Radius")
            .with_description("地理位置的精度半径（公里）")
            .with_icon("map-pin")
            .with_formatter(F::Distance),
        // Browser
        FieldDescriptor::new("browser.name", "浏览器", Browser, ValueType::String)
            .with_label_en("Browser")
            .with_description("浏览器名称")
            .with_icon("chrome")
            .as_copyable(),
        FieldDescriptor::new("browser.version", "浏览器版本", Browser, ValueType::String)
            .with_label_en("Browser Version")
            .with_description("浏览器版本号")
            .with_icon("settings")
            .as_copyable(),
        FieldDescriptor::new("browserDetails.browserName", "浏览器详情", Browser, ValueType::String)
            .with_label_en("Browser Details")
            .with_description("详细的浏览器信息")
            .with_icon("chrome")
            .as_copyable(),
        FieldDescriptor::new(
            "browserDetails.browserFullVersion",
            "完整版本号",
            Browser,
            ValueType::String,
        )
        .with_label_en("Full Version")
        .with_description("浏览器完整版本号")
        .with_icon("settings")
        .as_copyable(),
        FieldDescriptor::new("userAgent", "User Agent", Browser, ValueType::String)
            .with_label_en("User Agent")
            .with_description("浏览器用户代理字符串")
            .with_icon("code")
            .as_copyable(),
        FieldDescriptor::new("incognito", "隐身模式", Browser, ValueType::Boolean)
            .with_label_en("Incognito Mode")
            .with_description("是否处于隐身/私人浏览模式")
            .with_icon("eye")
            .with_formatter(F::Boolean)
            .with_risk_weight(10)
            .as_critical(),
        // Device
        FieldDescriptor::new("os.name", "操作系统", Device, ValueType::String)
            .with_label_en("Operating System")
            .with_description("设备操作系统名称")
            .with_icon("monitor")
            .as_copyable(),
        FieldDescriptor::new("os.version", "系统版本", Device, ValueType::String)
            .with_label_en("OS Version")
            .with_description("操作系统版本")
            .with_icon("settings")
            .as_copyable(),
        FieldDescriptor::new("device", "设备类型", Device, ValueType::String)
            .with_label_en("Device Type")
            .with_description("设备类型分类")
            .with_icon("smartphone")
            .as_copyable(),
        FieldDescriptor::new("browserDetails.device", "设备详情", Device, ValueType::String)
            .with_label_en("Device Details")
            .with_description("详细的设备信息")
            .with_icon("smartphone")
            .as_copyable(),
        // Risk detection
        FieldDescriptor::new("vpn.result", "VPN检测", RiskDetection, ValueType::Boolean)
            .with_label_en("VPN Detection")
            .with_description("是否检测到VPN使用")
            .with_icon("wifi")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(25)
            .as_critical(),
        FieldDescriptor::new(
            "vpn.methods.timezoneMismatch",
            "时区不匹配",
            RiskDetection,
            ValueType::Boolean,
        )
        .with_label_en("Timezone Mismatch")
        .with_description("VPN检测：时区与IP地理位置不匹配")
        .with_icon("clock")
        .with_formatter(F::Boolean)
        .as_critical(),
        FieldDescriptor::new("vpn.methods.publicVPN", "公共VPN", RiskDetection, ValueType::Boolean)
            .with_label_en("Public VPN")
            .with_description("VPN检测：检测到公共VPN服务")
            .with_icon("wifi")
            .with_formatter(F::Boolean)
            .as_critical(),
        FieldDescriptor::new("proxy.result", "代理检测", RiskDetection, ValueType::Boolean)
            .with_label_en("Proxy Detection")
            .with_description("是否检测到代理服务器使用")
            .with_icon("server")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(20)
            .as_critical(),
        FieldDescriptor::new("tor.result", "Tor网络检测", RiskDetection, ValueType::Boolean)
            .with_label_en("Tor Detection")
            .with_description("是否检测到Tor匿名网络使用")
            .with_icon("shield")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(30)
            .as_critical(),
        FieldDescriptor::new("tampering.result", "浏览器篡改", RiskDetection, ValueType::Boolean)
            .with_label_en("Browser Tampering")
            .with_description("是否检测到浏览器篡改行为")
            .with_icon("bug")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(35)
            .as_critical(),
        FieldDescriptor::new("tampering.anomalyScore", "异常评分", RiskDetection, ValueType::Score)
            .with_label_en("Anomaly Score")
            .with_description("浏览器篡改的异常程度评分")
            .with_icon("gauge")
            .with_formatter(F::Score)
            .as_critical(),
        FieldDescriptor::new("suspectScore", "可疑活动评分", RiskDetection, ValueType::Score)
            .with_label_en("Suspect Score")
            .with_description("综合可疑活动评分 (0-100)")
            .with_icon("alert-triangle")
            .with_formatter(F::Score)
            .as_critical(),
        // Advanced detection
        FieldDescriptor::new(
            "highActivity.result",
            "高频活动",
            AdvancedDetection,
            ValueType::Boolean,
        )
        .with_label_en("High Activity")
        .with_description("是否检测到异常高频的访问活动")
        .with_icon("activity")
        .with_formatter(F::RiskBoolean)
        .with_risk_weight(20)
        .as_critical(),
        FieldDescriptor::new(
            "highActivity.dailyRequests",
            "日请求数",
            AdvancedDetection,
            ValueType::Number,
        )
        .with_label_en("Daily Requests")
        .with_description("当日的请求次数")
        .with_icon("bar-chart-3")
        .with_formatter(F::Number),
        FieldDescriptor::new(
            "locationSpoofing.result",
            "位置欺骗",
            AdvancedDetection,
            ValueType::Boolean,
        )
        .with_label_en("Location Spoofing")
        .with_description("是否检测到地理位置欺骗")
        .with_icon("navigation")
        .with_formatter(F::RiskBoolean)
        .with_risk_weight(25)
        .as_critical(),
        FieldDescriptor::new(
            "virtualMachine.result",
            "虚拟机检测",
            AdvancedDetection,
            ValueType::Boolean,
        )
        .with_label_en("Virtual Machine")
        .with_description("是否检测到虚拟机环境")
        .with_icon("hard-drive")
        .with_formatter(F::RiskBoolean)
        .with_risk_weight(25)
        .as_critical(),
        FieldDescriptor::new(
            "developerTools.result",
            "开发者工具",
            AdvancedDetection,
            ValueType::Boolean,
        )
        .with_label_en("Developer Tools")
        .with_description("是否检测到开发者工具的使用")
        .with_icon("code")
        .with_formatter(F::Boolean)
        .with_risk_weight(15),
        FieldDescriptor::new(
            "remoteControl.result",
            "远程控制",
            AdvancedDetection,
            ValueType::Boolean,
        )
        .with_label_en("Remote Control")
        .with_description("是否检测到远程控制软件")
        .with_icon("monitor")
        .with_formatter(F::RiskBoolean)
        .with_risk_weight(40)
        .as_critical(),
        FieldDescriptor::new("velocity.result", "速度检测", AdvancedDetection, ValueType::Boolean)
            .with_label_en("Velocity Detection")
            .with_description("是否检测到异常的访问速度模式")
            .with_icon("zap")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(20)
            .as_critical(),
        // System
        FieldDescriptor::new("rootApps.result", "Root应用检测", System, ValueType::Boolean)
            .with_label_en("Root Apps Detection")
            .with_description("是否检测到Root权限应用")
            .with_icon("unlock")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(30)
            .as_critical(),
        FieldDescriptor::new("emulator.result", "模拟器检测", System, ValueType::Boolean)
            .with_label_en("Emulator Detection")
            .with_description("是否在模拟器环境中运行")
            .with_icon("smartphone")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(25)
            .as_critical(),
        FieldDescriptor::new("clonedApp.result", "克隆应用检测", System, ValueType::Boolean)
            .with_label_en("Cloned App Detection")
            .with_description("是否检测到应用克隆")
            .with_icon("settings")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(30)
            .as_critical(),
        FieldDescriptor::new("factoryReset.timestamp", "工厂重置时间", System, ValueType::Date)
            .with_label_en("Factory Reset Time")
            .with_description("设备最近一次工厂重置的时间")
            .with_icon("settings")
            .with_formatter(F::Timestamp),
        FieldDescriptor::new("jailbroken.result", "越狱检测", System, ValueType::Boolean)
            .with_label_en("Jailbreak Detection")
            .with_description("是否检测到设备越狱")
            .with_icon("unlock")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(30)
            .as_critical(),
        FieldDescriptor::new("frida.result", "Frida检测", System, ValueType::Boolean)
            .with_label_en("Frida Detection")
            .with_description("是否检测到Frida动态分析工具")
            .with_icon("bug")
            .with_formatter(F::RiskBoolean)
            .with_risk_weight(35)
            .as_critical(),
        FieldDescriptor::new("privacySettings.result", "隐私设置", System, ValueType::Boolean)
            .with_label_en("Privacy Settings")
            .with_description("隐私设置异常检测")
            .with_icon("lock")
            .with_formatter(F::Boolean),
        // Other
        FieldDescriptor::new("linkedId", "关联ID", Other, ValueType::String)
            .with_label_en("Linked ID")
            .with_description("自定义关联标识符")
            .with_icon("hash")
            .as_copyable()
            .hiding_empty(),
        FieldDescriptor::new("tag", "标签信息", Other, ValueType::Object)
            .with_label_en("Tag Information")
            .with_description("自定义标签数据")
            .with_icon("settings")
            .with_formatter(F::Object)
            .hiding_empty(),
        FieldDescriptor::new("rawDeviceAttributes", "原始设备属性", Other, ValueType::Object)
            .with_label_en("Raw Device Attributes")
            .with_description("原始设备属性数据")
            .with_icon("database")
            .with_formatter(F::Object)
            .hiding_empty(),
    ]
}

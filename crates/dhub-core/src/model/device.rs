// ── Devices ──
//
// One `Device` struct for every concrete device type. The `kind` tag picks
// the family, and `detail` carries the family-specific fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;
use url::Url;

use dhub_api::Collection;

use super::{
    has_type, id, ids, list, number, string, to_body, type_of, typed, Event,
    ParseContext, Tag, Teaser, Thing, ThingMeta,
};
use crate::error::CoreError;
use crate::identity::{Entity, EntityId, IdentityCache, Relation};
use crate::model::lot::Lot;
use crate::naming::Naming;

// ── Kinds ───────────────────────────────────────────────────────────

/// Every concrete device type the server knows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum DeviceKind {
    Device,
    Computer,
    Desktop,
    Laptop,
    Server,
    ComputerMonitor,
    Mobile,
    Smartphone,
    Tablet,
    Cellphone,
    Component,
    GraphicCard,
    DataStorage,
    HardDrive,
    SolidStateDrive,
    Motherboard,
    NetworkAdapter,
    Processor,
    RamModule,
    SoundCard,
    Display,
    ComputerAccessory,
    Mouse,
    MemoryCardReader,
    #[strum(serialize = "SAI")]
    Sai,
    Keyboard,
}

/// Branch of the device hierarchy a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DeviceFamily {
    Device,
    Computer,
    ComputerMonitor,
    Mobile,
    Component,
    Accessory,
}

impl DeviceKind {
    pub fn family(self) -> DeviceFamily {
        match self {
            Self::Device => DeviceFamily::Device,
            Self::Computer | Self::Desktop | Self::Laptop | Self::Server => DeviceFamily::Computer,
            Self::ComputerMonitor => DeviceFamily::ComputerMonitor,
            Self::Mobile | Self::Smartphone | Self::Tablet | Self::Cellphone => DeviceFamily::Mobile,
            Self::Component
            | Self::GraphicCard
            | Self::DataStorage
            | Self::HardDrive
            | Self::SolidStateDrive
            | Self::Motherboard
            | Self::NetworkAdapter
            | Self::Processor
            | Self::RamModule
            | Self::SoundCard
            | Self::Display => DeviceFamily::Component,
            Self::ComputerAccessory
            | Self::Mouse
            | Self::MemoryCardReader
            | Self::Sai
            | Self::Keyboard => DeviceFamily::Accessory,
        }
    }

    pub fn is_data_storage(self) -> bool {
        matches!(self, Self::DataStorage | Self::HardDrive | Self::SolidStateDrive)
    }
}

// ── Family details ──────────────────────────────────────────────────

/// Empty detail for kinds without own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoDetail {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputerDetail {
    /// Ids of the components, registered in the cache.
    #[serde(skip)]
    pub components: Vec<EntityId>,
    pub chassis: Option<String>,
    pub ram_size: Option<f64>,
    pub data_storage_size: Option<f64>,
    pub processor_model: Option<String>,
    pub graphic_card_model: Option<String>,
    pub network_speeds: Option<Vec<Option<f64>>>,
    #[serde(skip)]
    pub privacy: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileDetail {
    pub imei: Option<u64>,
    pub meid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryDetail {
    /// Keyboard layout.
    pub layout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicCardSpec {
    pub memory: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataStorageSpec {
    pub size: Option<f64>,
    pub interface: Option<String>,
    pub privacy: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotherboardSpec {
    pub slots: Option<u32>,
    pub usb: Option<u32>,
    pub firewire: Option<u32>,
    pub serial: Option<u32>,
    pub pcmcia: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkAdapterSpec {
    pub speed: Option<f64>,
    pub wireless: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSpec {
    pub speed: Option<f64>,
    pub cores: Option<u32>,
    pub threads: Option<u32>,
    pub address: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamModuleSpec {
    pub size: Option<f64>,
    pub speed: Option<f64>,
    pub interface: Option<String>,
    pub format: Option<String>,
}

/// Fields specific to each component type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComponentSpec {
    GraphicCard(GraphicCardSpec),
    DataStorage(DataStorageSpec),
    Motherboard(MotherboardSpec),
    NetworkAdapter(NetworkAdapterSpec),
    Processor(ProcessorSpec),
    RamModule(RamModuleSpec),
    Plain(NoDetail),
}

impl ComponentSpec {
    fn parse(kind: DeviceKind, payload: &Value) -> Result<Self, CoreError> {
        Ok(match kind {
            DeviceKind::GraphicCard => Self::GraphicCard(typed(payload, "GraphicCard")?),
            k if k.is_data_storage() => Self::DataStorage(typed(payload, "DataStorage")?),
            DeviceKind::Motherboard => Self::Motherboard(typed(payload, "Motherboard")?),
            DeviceKind::NetworkAdapter => Self::NetworkAdapter(typed(payload, "NetworkAdapter")?),
            DeviceKind::Processor => Self::Processor(typed(payload, "Processor")?),
            DeviceKind::RamModule => Self::RamModule(typed(payload, "RamModule")?),
            _ => Self::Plain(NoDetail {}),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDetail {
    /// Id of the computer holding this component. Lookup only.
    #[serde(skip)]
    pub parent: Option<EntityId>,
    #[serde(flatten)]
    pub spec: ComponentSpec,
}

/// Family-specific fields of a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeviceDetail {
    Computer(ComputerDetail),
    Mobile(MobileDetail),
    Component(ComponentDetail),
    Accessory(AccessoryDetail),
    Plain(NoDetail),
}

// ── Device ──────────────────────────────────────────────────────────

/// A physical or virtual asset.
///
/// At most one live instance exists per id: parse through
/// [`Device::from_object`] so the cache keeps it that way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(skip)]
    pub kind: DeviceKind,
    pub id: Option<EntityId>,
    pub hid: Option<String>,
    pub tags: Vec<Tag>,
    /// Title-cased on ingestion.
    pub model: Option<String>,
    /// Title-cased on ingestion.
    pub manufacturer: Option<String>,
    /// Upper-cased on ingestion.
    pub serial_number: Option<String>,
    pub weight: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    /// Newest first, as the server sends them.
    #[serde(skip)]
    pub events: Vec<Event>,
    #[serde(skip)]
    pub problems: Vec<Event>,
    #[serde(skip)]
    pub working: Vec<Event>,
    #[serde(skip)]
    pub rate: Option<Box<Event>>,
    #[serde(skip)]
    pub price: Option<Box<Event>>,
    #[serde(skip)]
    pub url: Option<Url>,
    #[serde(skip)]
    lots: Vec<EntityId>,
    pub trading: Option<String>,
    pub physical: Option<String>,
    pub physical_possessor: Option<String>,
    pub production_date: Option<String>,
    #[serde(flatten)]
    pub detail: DeviceDetail,
    #[serde(flatten)]
    pub meta: ThingMeta,
}

impl Device {
    /// A blank device of `kind`, for creating new resources.
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            id: None,
            hid: None,
            tags: Vec::new(),
            model: None,
            manufacturer: None,
            serial_number: None,
            weight: None,
            width: None,
            height: None,
            depth: None,
            events: Vec::new(),
            problems: Vec::new(),
            working: Vec::new(),
            rate: None,
            price: None,
            url: None,
            lots: Vec::new(),
            trading: None,
            physical: None,
            physical_possessor: None,
            production_date: None,
            detail: default_detail(kind),
            meta: ThingMeta::default(),
        }
    }

    /// Parse and register through the cache.
    ///
    /// A payload for a known id re-defines the cached instance (keeping its
    /// kind) and returns the same handle. Payloads without an id yield a
    /// handle that is not registered.
    pub fn from_object(payload: &Value, ctx: &ParseContext<'_>) -> Result<Entity<Self>, CoreError> {
        let Some(device_id) = id(payload, "id") else {
            return Self::parse(payload, ctx).map(Entity::new);
        };
        ctx.cache
            .devices
            .get_or_create(device_id, payload, |current, payload| match current {
                Some(existing) => Self::parse_as(existing.kind, payload, ctx),
                None => Self::parse(payload, ctx),
            })
    }

    /// Parse without touching the cache for this device itself (nested
    /// components are still registered).
    pub fn parse(payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let type_name = type_of(payload).unwrap_or("Device");
        let name = Naming::pop_prefix(type_name).map_or(type_name, |(_, name)| name);
        let kind = name.parse::<DeviceKind>().map_err(|_| CoreError::UnknownType {
            type_name: type_name.to_owned(),
        })?;
        Self::parse_as(kind, payload, ctx)
    }

    fn parse_as(kind: DeviceKind, payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let tags = list(payload, "tags")
            .iter()
            .filter(|t| t.is_object())
            .map(|t| Tag::parse(t, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind,
            id: id(payload, "id"),
            hid: string(payload, "hid"),
            tags,
            model: string(payload, "model").map(|m| Naming::titleize(&m)),
            manufacturer: string(payload, "manufacturer").map(|m| Naming::titleize(&m)),
            serial_number: string(payload, "serialNumber").map(|s| s.to_uppercase()),
            weight: number(payload, "weight"),
            width: number(payload, "width"),
            height: number(payload, "height"),
            depth: number(payload, "depth"),
            events: nested_events(list(payload, "events"), ctx)?,
            problems: nested_events(list(payload, "problems"), ctx)?,
            working: nested_events(list(payload, "working"), ctx)?,
            rate: nested_event(payload.get("rate"), ctx)?.map(Box::new),
            price: nested_event(payload.get("price"), ctx)?.map(Box::new),
            url: string(payload, "url").and_then(|u| ctx.url(&u)),
            lots: ids(payload, "lots"),
            trading: string(payload, "trading"),
            physical: string(payload, "physical"),
            physical_possessor: string(payload, "physicalPossessor"),
            production_date: string(payload, "productionDate"),
            detail: parse_detail(kind, payload, ctx)?,
            meta: ThingMeta::parse(payload),
        })
    }

    /// Ids of the lots this device is in.
    pub fn lot_ids(&self) -> &[EntityId] {
        &self.lots
    }

    pub fn lots(&self, cache: &IdentityCache) -> Vec<Relation<Lot>> {
        self.lots.iter().map(|id| cache.lots.relation(id)).collect()
    }

    /// Computer holding this component. `None` for non-components or
    /// loose components.
    pub fn parent(&self, cache: &IdentityCache) -> Option<Relation<Device>> {
        match &self.detail {
            DeviceDetail::Component(c) => c.parent.as_ref().map(|id| cache.devices.relation(id)),
            _ => None,
        }
    }

    /// Components of a computer.
    pub fn components(&self, cache: &IdentityCache) -> Vec<Relation<Device>> {
        match &self.detail {
            DeviceDetail::Computer(c) => c.components.iter().map(|id| cache.devices.relation(id)).collect(),
            _ => Vec::new(),
        }
    }

    /// `trading / physical`, either one, or `Registered`; humanized.
    pub fn status(&self) -> String {
        let status = match (&self.trading, &self.physical) {
            (Some(trading), Some(physical)) => format!("{trading} / {physical}"),
            (None, Some(state)) | (Some(state), None) => state.clone(),
            (None, None) => "Registered".to_owned(),
        };
        Naming::humanize(&status)
    }

    /// Rating of the current rate, if any.
    pub fn rating(&self) -> Option<f64> {
        self.rate.as_ref().and_then(|r| r.rating())
    }
}

fn default_detail(kind: DeviceKind) -> DeviceDetail {
    match kind.family() {
        DeviceFamily::Computer => DeviceDetail::Computer(ComputerDetail::default()),
        DeviceFamily::Mobile => DeviceDetail::Mobile(MobileDetail::default()),
        DeviceFamily::Component => DeviceDetail::Component(ComponentDetail {
            parent: None,
            spec: match kind {
                DeviceKind::GraphicCard => ComponentSpec::GraphicCard(GraphicCardSpec::default()),
                k if k.is_data_storage() => ComponentSpec::DataStorage(DataStorageSpec::default()),
                DeviceKind::Motherboard => ComponentSpec::Motherboard(MotherboardSpec::default()),
                DeviceKind::NetworkAdapter => ComponentSpec::NetworkAdapter(NetworkAdapterSpec::default()),
                DeviceKind::Processor => ComponentSpec::Processor(ProcessorSpec::default()),
                DeviceKind::RamModule => ComponentSpec::RamModule(RamModuleSpec::default()),
                _ => ComponentSpec::Plain(NoDetail {}),
            },
        }),
        DeviceFamily::Accessory => DeviceDetail::Accessory(AccessoryDetail::default()),
        DeviceFamily::Device | DeviceFamily::ComputerMonitor => DeviceDetail::Plain(NoDetail {}),
    }
}

fn parse_detail(kind: DeviceKind, payload: &Value, ctx: &ParseContext<'_>) -> Result<DeviceDetail, CoreError> {
    Ok(match kind.family() {
        DeviceFamily::Computer => {
            let mut detail: ComputerDetail = typed(payload, "Computer")?;
            for component in list(payload, "components") {
                let entity = Device::from_object(component, ctx)?;
                match entity.load().id.clone() {
                    Some(component_id) => detail.components.push(component_id),
                    None => debug!("skipping component without id"),
                }
            }
            detail.privacy = nested_events(list(payload, "privacy"), ctx)?;
            DeviceDetail::Computer(detail)
        }
        DeviceFamily::Mobile => DeviceDetail::Mobile(typed(payload, "Mobile")?),
        DeviceFamily::Component => DeviceDetail::Component(ComponentDetail {
            parent: id(payload, "parent"),
            spec: ComponentSpec::parse(kind, payload)?,
        }),
        DeviceFamily::Accessory => DeviceDetail::Accessory(typed(payload, "ComputerAccessory")?),
        DeviceFamily::Device | DeviceFamily::ComputerMonitor => DeviceDetail::Plain(NoDetail {}),
    })
}

/// Parse nested events that carry a `type`; bare ids are skipped.
pub(crate) fn nested_events(values: &[Value], ctx: &ParseContext<'_>) -> Result<Vec<Event>, CoreError> {
    let mut events = Vec::with_capacity(values.len());
    for value in values {
        if has_type(value) {
            events.push(Event::parse(value, ctx)?);
        } else {
            debug!(?value, "skipping unexpanded event reference");
        }
    }
    Ok(events)
}

fn nested_event(value: Option<&Value>, ctx: &ParseContext<'_>) -> Result<Option<Event>, CoreError> {
    match value {
        Some(v) if has_type(v) => Event::parse(v, ctx).map(Some),
        _ => Ok(None),
    }
}

/// Id of a one-device reference. Nested devices are registered first.
pub(crate) fn device_ref(value: Option<&Value>, ctx: &ParseContext<'_>) -> Result<Option<EntityId>, CoreError> {
    match value {
        Some(v) if has_type(v) => Ok(Device::from_object(v, ctx)?.load().id.clone()),
        Some(v) => Ok(EntityId::from_ref(v)),
        None => Ok(None),
    }
}

impl Thing for Device {
    const COLLECTION: Collection = Collection::Devices;

    fn type_name(&self) -> &'static str {
        self.kind.into()
    }

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn meta(&self) -> &ThingMeta {
        &self.meta
    }

    fn title(&self) -> String {
        let mut parts = vec![self.type_human()];
        parts.extend(self.model.clone());
        if self.kind.family() == DeviceFamily::Component {
            parts.extend(self.serial_number.clone());
        } else if let Some(tag) = self.tags.first() {
            parts.push(tag.title());
        }
        parts.join(" ")
    }

    fn teaser(&self) -> Teaser {
        Teaser {
            type_human: self.type_human(),
            title: self.title(),
            description: format!(
                "{} ({})",
                self.model.as_deref().unwrap_or_default(),
                self.manufacturer.as_deref().unwrap_or_default()
            ),
            date: self.meta.updated,
            severity: None,
        }
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "Device")
    }

    fn define(&mut self, payload: &Value, ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        *self = Self::parse_as(self.kind, payload, ctx)?;
        Ok(())
    }
}

// ── Events ──
//
// Immutable log entries applied to one device or to many. Events are never
// cached: each parse builds a fresh value even when the id recurs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use url::Url;

use dhub_api::Collection;

use super::device::device_ref;
use super::{
    boolean, id, ids, string, timestamp, to_body, type_of, typed, Device, ParseContext, Teaser,
    Thing, ThingMeta,
};
use crate::error::CoreError;
use crate::identity::{EntityId, IdentityCache, Relation};
use crate::naming::Naming;

// ── Kinds ───────────────────────────────────────────────────────────

/// Every concrete event type the server knows.
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
pub enum EventKind {
    Add,
    Remove,
    EraseBasic,
    EraseSectors,
    ErasePhysical,
    Rate,
    IndividualRate,
    ManualRate,
    WorkbenchRate,
    AggregateRate,
    Price,
    EreusePrice,
    Install,
    Snapshot,
    Test,
    TestDataStorage,
    StressTest,
    Benchmark,
    BenchmarkDataStorage,
    BenchmarkWithRate,
    BenchmarkProcessor,
    BenchmarkProcessorSysbench,
    BenchmarkRamSysbench,
    ToRepair,
    Repair,
    ReadyToUse,
    ToPrepare,
    Prepare,
    Organize,
    Reserve,
    CancelReservation,
    Trade,
    Sell,
    Donate,
    CancelTrade,
    ToDisposeProduct,
    DisposeProduct,
    Receive,
}

impl EventKind {
    /// Whether the event applies to a list of devices rather than one.
    pub fn has_multiple_devices(self) -> bool {
        matches!(
            self,
            Self::ToRepair
                | Self::Repair
                | Self::ReadyToUse
                | Self::ToPrepare
                | Self::Prepare
                | Self::Organize
                | Self::Reserve
                | Self::CancelReservation
                | Self::Trade
                | Self::Sell
                | Self::Donate
                | Self::CancelTrade
                | Self::ToDisposeProduct
                | Self::DisposeProduct
                | Self::Receive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Error,
}

/// Coarse band of a rating score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
pub enum RatingRange {
    VeryLow,
    Low,
    Medium,
    High,
}

impl RatingRange {
    pub fn from_score(score: f64) -> Self {
        if score <= 2.0 {
            Self::VeryLow
        } else if score <= 3.0 {
            Self::Low
        } else if score <= 4.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn human(self) -> String {
        Naming::humanize(self.as_ref())
    }
}

// ── Details ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EraseDetail {
    pub steps: Option<Vec<Value>>,
    pub standards: Option<Vec<String>>,
    pub certificate: Option<String>,
    /// Only for physical erasure.
    pub method: Option<String>,
}

impl EraseDetail {
    pub fn standards_human(&self) -> String {
        match self.standards.as_deref() {
            Some(standards) if !standards.is_empty() => standards.join(", "),
            _ => "Non-standard".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateDetail {
    pub rating: Option<f64>,
    pub software: Option<String>,
    pub version: Option<String>,
    pub appearance: Option<f64>,
    pub functionality: Option<f64>,
    pub rating_range: Option<String>,
    pub appearance_range: Option<String>,
    pub functionality_range: Option<String>,
    pub labelling: Option<bool>,
    pub processor: Option<f64>,
    pub ram: Option<f64>,
    pub data_storage: Option<f64>,
    pub graphic_card: Option<f64>,
    pub bios: Option<f64>,
    pub bios_range: Option<String>,
    pub data_storage_range: Option<String>,
    pub ram_range: Option<String>,
    pub processor_range: Option<String>,
    pub graphic_card_range: Option<String>,
    pub workbench: Option<Value>,
    pub manual: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriceDetail {
    pub currency: Option<String>,
    pub price: Option<f64>,
    pub software: Option<String>,
    pub version: Option<String>,
    pub rating: Option<Value>,
    pub warranty2: Option<Value>,
    pub refurbisher: Option<Value>,
    pub retailer: Option<Value>,
    pub platform: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallDetail {
    pub elapsed: Option<Value>,
    pub address: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotDetail {
    pub uuid: Option<String>,
    pub software: Option<String>,
    pub version: Option<String>,
    pub events: Option<Vec<Value>>,
    pub expected_events: Option<Vec<String>>,
    pub elapsed: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestDetail {
    pub elapsed: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestDataStorageDetail {
    pub elapsed: Option<Value>,
    pub length: Option<String>,
    pub status: Option<String>,
    /// Hours.
    pub lifetime: Option<f64>,
    pub assessment: Option<bool>,
    pub reallocated_sector_count: Option<i64>,
    pub power_cycle_count: Option<i64>,
    pub reported_uncorrectable_errors: Option<i64>,
    pub command_timeout: Option<i64>,
    pub current_pending_sector_count: Option<i64>,
    pub offline_uncorrectable: Option<i64>,
    pub remaining_lifetime_percentage: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BenchmarkDetail {
    pub elapsed: Option<Value>,
    pub read_speed: Option<f64>,
    pub write_speed: Option<f64>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TradeDetail {
    pub shipping_date: Option<String>,
    pub invoice_number: Option<String>,
    pub price: Option<Value>,
    pub to: Option<Value>,
    pub confirms: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveDetail {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoDetail {}

/// Fields specific to each event family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetail {
    Erase(EraseDetail),
    Rate(RateDetail),
    Price(PriceDetail),
    Install(InstallDetail),
    Snapshot(SnapshotDetail),
    Test(TestDetail),
    TestDataStorage(TestDataStorageDetail),
    Benchmark(BenchmarkDetail),
    Trade(TradeDetail),
    Receive(ReceiveDetail),
    Plain(NoDetail),
}

impl EventDetail {
    fn parse(kind: EventKind, payload: &Value) -> Result<Self, CoreError> {
        use EventKind as K;
        let what = kind.as_ref();
        Ok(match kind {
            K::EraseBasic | K::EraseSectors | K::ErasePhysical => Self::Erase(typed(payload, what)?),
            K::Rate | K::IndividualRate | K::ManualRate | K::WorkbenchRate | K::AggregateRate => {
                Self::Rate(typed(payload, what)?)
            }
            K::Price | K::EreusePrice => Self::Price(typed(payload, what)?),
            K::Install => Self::Install(typed(payload, what)?),
            K::Snapshot => Self::Snapshot(typed(payload, what)?),
            K::Test | K::StressTest => Self::Test(typed(payload, what)?),
            K::TestDataStorage => Self::TestDataStorage(typed(payload, what)?),
            K::Benchmark
            | K::BenchmarkDataStorage
            | K::BenchmarkWithRate
            | K::BenchmarkProcessor
            | K::BenchmarkProcessorSysbench
            | K::BenchmarkRamSysbench => Self::Benchmark(typed(payload, what)?),
            K::Trade | K::Sell | K::Donate | K::CancelTrade | K::ToDisposeProduct | K::DisposeProduct => {
                Self::Trade(typed(payload, what)?)
            }
            K::Receive => Self::Receive(typed(payload, what)?),
            K::Add
            | K::Remove
            | K::ToRepair
            | K::Repair
            | K::ReadyToUse
            | K::ToPrepare
            | K::Prepare
            | K::Organize
            | K::Reserve
            | K::CancelReservation => Self::Plain(NoDetail {}),
        })
    }
}

/// Devices an event applies to, stored as ids.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTarget {
    One(Option<EntityId>),
    Many(Vec<EntityId>),
}

// ── Event ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(skip)]
    pub kind: EventKind,
    pub id: Option<EntityId>,
    pub name: Option<String>,
    pub closed: Option<bool>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub agent: Option<Value>,
    pub author: Option<Value>,
    #[serde(skip)]
    pub target: EventTarget,
    #[serde(skip)]
    components: Vec<EntityId>,
    #[serde(skip)]
    parent: Option<EntityId>,
    #[serde(skip)]
    pub url: Option<Url>,
    #[serde(flatten)]
    pub detail: EventDetail,
    #[serde(flatten)]
    pub meta: ThingMeta,
}

impl Event {
    /// A blank event of `kind`, for creating new resources.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            id: None,
            name: None,
            closed: None,
            severity: None,
            description: None,
            start_time: None,
            end_time: None,
            agent: None,
            author: None,
            target: if kind.has_multiple_devices() {
                EventTarget::Many(Vec::new())
            } else {
                EventTarget::One(None)
            },
            components: Vec::new(),
            parent: None,
            url: None,
            detail: EventDetail::parse(kind, &Value::Object(Map::new()))
                .unwrap_or(EventDetail::Plain(NoDetail {})),
            meta: ThingMeta::default(),
        }
    }

    pub fn parse(payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let type_name = type_of(payload).ok_or_else(|| CoreError::parse("event", "payload has no type"))?;
        let name = Naming::pop_prefix(type_name).map_or(type_name, |(_, name)| name);
        let kind = name.parse::<EventKind>().map_err(|_| CoreError::UnknownType {
            type_name: type_name.to_owned(),
        })?;
        Self::parse_as(kind, payload, ctx)
    }

    fn parse_as(kind: EventKind, payload: &Value, ctx: &ParseContext<'_>) -> Result<Self, CoreError> {
        let severity = string(payload, "severity")
            .map(|s| {
                s.parse::<Severity>()
                    .map_err(|_| CoreError::parse("severity", format!("unknown severity {s}")))
            })
            .transpose()?;

        let target = if kind.has_multiple_devices() {
            EventTarget::Many(ids(payload, "devices"))
        } else {
            EventTarget::One(device_ref(payload.get("device"), ctx)?)
        };

        Ok(Self {
            kind,
            id: id(payload, "id"),
            name: string(payload, "name"),
            closed: boolean(payload, "closed"),
            severity,
            description: string(payload, "description"),
            start_time: timestamp(payload, "startTime"),
            end_time: timestamp(payload, "endTime"),
            agent: payload.get("agent").filter(|v| !v.is_null()).cloned(),
            author: payload.get("author").filter(|v| !v.is_null()).cloned(),
            target,
            components: ids(payload, "components"),
            parent: id(payload, "parent"),
            url: string(payload, "url").and_then(|u| ctx.url(&u)),
            detail: EventDetail::parse(kind, payload)?,
            meta: ThingMeta::parse(payload),
        })
    }

    /// The device of a single-device event.
    pub fn device(&self, cache: &IdentityCache) -> Option<Relation<Device>> {
        match &self.target {
            EventTarget::One(Some(id)) => Some(cache.devices.relation(id)),
            _ => None,
        }
    }

    /// The devices of a multi-device event.
    pub fn devices(&self, cache: &IdentityCache) -> Vec<Relation<Device>> {
        match &self.target {
            EventTarget::Many(ids) => ids.iter().map(|id| cache.devices.relation(id)).collect(),
            EventTarget::One(_) => Vec::new(),
        }
    }

    pub fn device_ids(&self) -> Vec<EntityId> {
        match &self.target {
            EventTarget::Many(ids) => ids.clone(),
            EventTarget::One(id) => id.iter().cloned().collect(),
        }
    }

    pub fn components(&self, cache: &IdentityCache) -> Vec<Relation<Device>> {
        self.components.iter().map(|id| cache.devices.relation(id)).collect()
    }

    pub fn parent(&self, cache: &IdentityCache) -> Option<Relation<Device>> {
        self.parent.as_ref().map(|id| cache.devices.relation(id))
    }

    pub fn rating(&self) -> Option<f64> {
        match &self.detail {
            EventDetail::Rate(rate) => rate.rating,
            _ => None,
        }
    }

    fn erasure_method(&self, detail: &EraseDetail) -> String {
        match self.kind {
            EventKind::EraseSectors => "Badblocks".to_owned(),
            EventKind::ErasePhysical => detail.method.clone().unwrap_or_else(|| "Physical".to_owned()),
            _ => "Shred".to_owned(),
        }
    }

    fn status_human(&self, detail: &TestDataStorageDetail) -> String {
        let status = if self.severity == Some(Severity::Warning) {
            "Data storage can die soon.".to_owned()
        } else {
            detail.status.as_deref().map(Naming::humanize).unwrap_or_default()
        };
        match self.severity {
            Some(severity) => format!("{severity}: {status}"),
            None => status,
        }
    }

    fn base_title(&self) -> String {
        match self.severity {
            Some(severity) => format!("{}: {severity}", self.type_human()),
            None => self.type_human(),
        }
    }
}

impl Thing for Event {
    const COLLECTION: Collection = Collection::Events;

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
        let base = self.base_title();
        match &self.detail {
            EventDetail::Erase(erase) => format!(
                "{base} - {} {}",
                self.erasure_method(erase),
                erase.standards_human()
            ),
            EventDetail::Snapshot(snapshot) => format!(
                "{base} - {} {}",
                snapshot.software.as_deref().unwrap_or_default(),
                snapshot.version.as_deref().unwrap_or_default()
            ),
            EventDetail::Rate(RateDetail { rating: Some(rating), .. }) => {
                format!("{} ({rating:.2})", RatingRange::from_score(*rating).human())
            }
            EventDetail::TestDataStorage(test) => {
                format!("{} - {}", self.type_human(), self.status_human(test))
            }
            _ => base,
        }
    }

    fn teaser(&self) -> Teaser {
        let description = match &self.detail {
            EventDetail::TestDataStorage(test) => {
                let at = self
                    .device_ids()
                    .first()
                    .map(|id| format!(" At {id}."))
                    .unwrap_or_default();
                let lifetime = test
                    .lifetime
                    .map(|hours| format!(" Lifetime of {:.1} years.", hours / (24.0 * 365.0)))
                    .unwrap_or_default();
                format!("{}{at}{lifetime}", self.status_human(test))
            }
            _ => self.description.clone().unwrap_or_default(),
        };
        Teaser {
            type_human: self.type_human(),
            title: self.base_title(),
            description,
            date: self.meta.created,
            severity: self.severity,
        }
    }

    fn raw_body(&self) -> Result<Map<String, Value>, CoreError> {
        to_body(self, "Event")
    }

    /// Multi-device events echo their device ids verbatim.
    fn post_relations(&self) -> Vec<(&'static str, Value)> {
        match &self.target {
            EventTarget::Many(ids) => vec![(
                "devices",
                Value::Array(ids.iter().map(EntityId::to_value).collect()),
            )],
            EventTarget::One(_) => Vec::new(),
        }
    }

    fn define(&mut self, payload: &Value, ctx: &ParseContext<'_>) -> Result<(), CoreError> {
        *self = Self::parse_as(self.kind, payload, ctx)?;
        Ok(())
    }
}

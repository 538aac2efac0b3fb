use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub const DEFAULT_CATEGORY: &str = "other";
pub const DEFAULT_PRIORITY: u8 = 2;

/// A packing checklist for one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripList {
    pub id: String,
    pub name: String,
    pub destination: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    #[serde(default)]
    pub items: Vec<TripItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl TripList {
    pub fn new(input: NewTripList) -> Self {
        Self {
            id: generate_id("trip"),
            name: input.name,
            destination: input.destination,
            start_date: input.start_date,
            end_date: input.end_date,
            items: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Shallow merge: only the fields present in the patch are replaced.
    pub fn apply(&mut self, patch: TripListPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(destination) = patch.destination {
            self.destination = destination;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(items) = patch.items {
            self.items = items;
        }
    }

    /// Share of completed items, 100 for an empty list.
    pub fn completion_percent(&self) -> f64 {
        if self.items.is_empty() {
            return 100.0;
        }
        let done = self.items.iter().filter(|i| i.completed).count();
        done as f64 / self.items.len() as f64 * 100.0
    }

    pub fn completion_rounded(&self) -> u32 {
        self.completion_percent().round() as u32
    }

    pub fn pending_items(&self) -> impl Iterator<Item = &TripItem> {
        self.items.iter().filter(|i| !i.completed)
    }
}

impl TripItem {
    pub fn new(input: NewTripItem) -> Self {
        Self {
            id: generate_id("item"),
            text: input.text,
            completed: false,
            category: input.category.unwrap_or_else(default_category),
            priority: input.priority.unwrap_or(DEFAULT_PRIORITY),
            notes: input.notes.unwrap_or_default(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn apply(&mut self, patch: TripItemPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTripList {
    pub name: String,
    pub destination: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripListPatch {
    pub name: Option<String>,
    pub destination: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub items: Option<Vec<TripItem>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTripItem {
    pub text: String,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripItemPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub notes: Option<String>,
}

/// Display data for an item category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub const CATEGORIES: [ItemCategory; 6] = [
    ItemCategory { id: "documents", name: "Documents", icon: "file-text" },
    ItemCategory { id: "clothing", name: "Clothing", icon: "shirt" },
    ItemCategory { id: "electronics", name: "Electronics", icon: "mobile-alt" },
    ItemCategory { id: "hygiene", name: "Hygiene", icon: "droplet" },
    ItemCategory { id: "medication", name: "Medication", icon: "pills" },
    ItemCategory { id: "other", name: "Other", icon: "box" },
];

const UNCATEGORIZED: ItemCategory = ItemCategory {
    id: "other",
    name: "Uncategorized",
    icon: "package",
};

pub fn category(id: &str) -> ItemCategory {
    CATEGORIES
        .iter()
        .copied()
        .find(|c| c.id == id)
        .unwrap_or(UNCATEGORIZED)
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `{prefix}_{unix_millis}_{9 base36 chars}`
pub fn generate_id(prefix: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{prefix}_{millis}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample_list() -> TripList {
        TripList::new(NewTripList {
            name: "Summer".into(),
            destination: "Lisbon".into(),
            start_date: date!(2024 - 06 - 10),
            end_date: date!(2024 - 06 - 20),
        })
    }

    #[test]
    fn ids_follow_prefix_millis_suffix_shape() {
        let id = generate_id("trip");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "trip");
        assert!(parts[1].parse::<i128>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn completion_is_full_for_empty_list() {
        assert_eq!(sample_list().completion_rounded(), 100);
    }

    #[test]
    fn completion_rounds_one_of_three() {
        let mut list = sample_list();
        for text in ["passport", "charger", "towel"] {
            list.items.push(TripItem::new(NewTripItem {
                text: text.into(),
                ..Default::default()
            }));
        }
        list.items[0].completed = true;
        assert_eq!(list.completion_rounded(), 33);
        assert_eq!(list.pending_items().count(), 2);
    }

    #[test]
    fn new_item_uses_defaults() {
        let item = TripItem::new(NewTripItem {
            text: "socks".into(),
            ..Default::default()
        });
        assert_eq!(item.category, "other");
        assert_eq!(item.priority, 2);
        assert_eq!(item.notes, "");
        assert!(!item.completed);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut list = sample_list();
        list.apply(TripListPatch {
            destination: Some("Porto".into()),
            ..Default::default()
        });
        assert_eq!(list.destination, "Porto");
        assert_eq!(list.name, "Summer");
        assert_eq!(list.start_date, date!(2024 - 06 - 10));
    }

    #[test]
    fn unknown_category_falls_back() {
        assert_eq!(category("clothing").icon, "shirt");
        let fallback = category("snacks");
        assert_eq!(fallback.id, "other");
        assert_eq!(fallback.name, "Uncategorized");
        assert_eq!(fallback.icon, "package");
    }

    #[test]
    fn dates_serialize_as_plain_iso() {
        let json = serde_json::to_value(sample_list()).unwrap();
        assert_eq!(json["startDate"], "2024-06-10");
        assert!(json["createdAt"].as_str().unwrap().contains('T'));
    }
}

//! Static schema tables.
//!
//! A [`SchemaTable`] holds the container child ordering, the elementary and
//! built-in data types, and the instruction catalog. It is immutable once
//! built and is shared between documents behind an `Arc`. Tests and future
//! format revisions can construct their own table instead of relying on a
//! process-wide singleton.

mod builtin;
mod catalog;

use std::collections::HashMap;

use log::trace;

pub use builtin::{STRING_CAPACITY, string_type};
pub use catalog::{ArgRole, InstructionSpec};

use crate::types::{BaseKind, TypeDefinition};

const CONTROLLER_ORDER: &[&str] = &[
    "RedundancyInfo",
    "Security",
    "SafetyInfo",
    "DataTypes",
    "Modules",
    "AddOnInstructionDefinitions",
    "AlarmDefinitions",
    "Tags",
    "Programs",
    "Tasks",
    "CST",
    "WallClockTime",
    "Trends",
    "DataLogs",
    "TimeSynchronize",
    "EthernetPorts",
    "OpcUaInfo",
];

const TAG_ORDER: &[&str] = &[
    "AlarmConditions",
    "ConsumeInfo",
    "Description",
    "Data",
    "ForceData",
    "Comments",
];

const STANDARD_ORDERS: &[(&str, &[&str])] = &[
    ("RSLogix5000Content", &["Controller"]),
    ("Controller", CONTROLLER_ORDER),
    ("DataTypes", &["DataType"]),
    ("DataType", &["Description", "Members"]),
    ("Members", &["Member"]),
    ("Member", &["Description"]),
    ("Modules", &["Module"]),
    (
        "Module",
        &["Description", "EKey", "Ports", "Communications", "ExtendedProperties"],
    ),
    ("Ports", &["Port"]),
    ("AddOnInstructionDefinitions", &["AddOnInstructionDefinition"]),
    (
        "AddOnInstructionDefinition",
        &[
            "Description",
            "RevisionNote",
            "AdditionalHelpText",
            "Parameters",
            "LocalTags",
            "Routines",
            "Dependencies",
        ],
    ),
    ("Parameters", &["Parameter"]),
    ("Parameter", &["Description", "DefaultData"]),
    ("LocalTags", &["LocalTag"]),
    ("LocalTag", &["Description", "DefaultData"]),
    ("Tags", &["Tag"]),
    ("Tag", TAG_ORDER),
    ("Programs", &["Program"]),
    ("Program", &["Description", "Tags", "Routines"]),
    ("Routines", &["Routine"]),
    (
        "Routine",
        &["Description", "RLLContent", "STContent", "FBDContent", "SFCContent"],
    ),
    ("RLLContent", &["Rung"]),
    ("Rung", &["Comment", "Text"]),
    ("STContent", &["Line"]),
    ("Tasks", &["Task"]),
    ("Task", &["Description", "ScheduledPrograms"]),
    ("ScheduledPrograms", &["ScheduledProgram"]),
];

/// Predefined types whose layout is carried opaquely. Tags of these types
/// are legal but their values are never decoded.
const OPAQUE_TYPES: &[&str] = &[
    "MESSAGE",
    "PID",
    "ALARM_ANALOG",
    "ALARM_DIGITAL",
    "MOTION_GROUP",
    "MOTION_INSTRUCTION",
    "AXIS_CIP_DRIVE",
    "AXIS_VIRTUAL",
    "AXIS_GENERIC",
    "AXIS_SERVO",
    "COORDINATE_SYSTEM",
    "SERIAL_PORT_CONTROL",
    "CAM",
    "CAM_PROFILE",
    "OUTPUT_CAM",
    "OUTPUT_COMPENSATION",
    "FBD_TIMER",
    "FBD_COUNTER",
];

/// Immutable schema configuration.
#[derive(Debug, Clone)]
pub struct SchemaTable {
    orders: HashMap<String, Vec<String>>,
    builtin_types: Vec<TypeDefinition>,
    opaque_types: Vec<String>,
    instructions: HashMap<String, InstructionSpec>,
}

impl SchemaTable {
    /// The table describing the current project format.
    pub fn standard() -> Self {
        let orders = STANDARD_ORDERS
            .iter()
            .map(|(label, order)| {
                (
                    label.to_string(),
                    order.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        let instructions = catalog::STANDARD_INSTRUCTIONS
            .iter()
            .map(|spec| (spec.name().to_string(), *spec))
            .collect();

        Self {
            orders,
            builtin_types: builtin::standard_types(),
            opaque_types: OPAQUE_TYPES.iter().map(|s| s.to_string()).collect(),
            instructions,
        }
    }

    /// Replace the child order of one container.
    pub fn with_child_order(mut self, label: impl Into<String>, order: Vec<String>) -> Self {
        self.orders.insert(label.into(), order);
        self
    }

    /// Add or replace a built-in type.
    pub fn with_builtin_type(mut self, definition: TypeDefinition) -> Self {
        self.builtin_types
            .retain(|t| !t.name().eq_ignore_ascii_case(definition.name()));
        self.builtin_types.push(definition);
        self
    }

    /// Mandated child order of a container, if the container is ordered.
    pub fn child_order(&self, container: &str) -> Option<&[String]> {
        self.orders.get(container).map(Vec::as_slice)
    }

    /// Rank of `child` within `container`.
    ///
    /// `None` when the container has no order or the label is not part of it.
    pub fn rank(&self, container: &str, child: &str) -> Option<usize> {
        let rank = self
            .child_order(container)?
            .iter()
            .position(|label| label == child);
        trace!(container, child, rank:?; "Schema rank lookup");
        rank
    }

    /// Elementary kind for a type name.
    pub fn base_kind(&self, name: &str) -> Option<BaseKind> {
        BaseKind::from_name(name)
    }

    /// Built-in structure by name, ignoring case.
    pub fn builtin_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.builtin_types
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn builtin_types(&self) -> &[TypeDefinition] {
        &self.builtin_types
    }

    /// Whether the name is elementary or built-in.
    pub fn is_predefined_type(&self, name: &str) -> bool {
        self.base_kind(name).is_some() || self.builtin_type(name).is_some()
    }

    /// Whether the name is a predefined type without a decodable layout.
    pub fn is_opaque_type(&self, name: &str) -> bool {
        self.opaque_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Whether a tag or member may use this type without a user definition.
    ///
    /// Module-defined types such as `AB:1756_DI:I:0` carry a `:` and always
    /// count as known.
    pub fn is_known_type(&self, name: &str) -> bool {
        self.is_predefined_type(name) || self.is_opaque_type(name) || name.contains(':')
    }

    /// Catalog entry for an instruction mnemonic, ignoring case.
    pub fn instruction(&self, name: &str) -> Option<&InstructionSpec> {
        self.instructions
            .get(name)
            .or_else(|| self.instructions.get(&name.to_ascii_uppercase()))
    }
}

impl Default for SchemaTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_order() {
        let schema = SchemaTable::standard();
        let data_types = schema.rank("Controller", "DataTypes").unwrap();
        let tags = schema.rank("Controller", "Tags").unwrap();
        let tasks = schema.rank("Controller", "Tasks").unwrap();
        assert!(data_types < tags && tags < tasks);
        assert_eq!(schema.rank("Controller", "Bogus"), None);
        assert_eq!(schema.rank("Unknown", "Tag"), None);
    }

    #[test]
    fn test_tag_order() {
        let schema = SchemaTable::standard();
        assert!(
            schema.rank("Tag", "Description").unwrap() < schema.rank("Tag", "Data").unwrap()
        );
    }

    #[test]
    fn test_builtin_timer_layout() {
        let schema = SchemaTable::standard();
        let timer = schema.builtin_type("timer").unwrap();
        let visible: Vec<_> = timer.visible_members().map(|m| m.name()).collect();
        assert_eq!(visible, ["PRE", "ACC", "EN", "TT", "DN"]);
        assert_eq!(timer.member("EN").unwrap().bit_binding().unwrap().bit, 31);
    }

    #[test]
    fn test_custom_table_is_independent() {
        let schema = SchemaTable::standard().with_child_order(
            "Tags",
            vec!["Tag".to_string(), "Note".to_string()],
        );
        assert_eq!(schema.rank("Tags", "Note"), Some(1));
        assert_eq!(SchemaTable::standard().rank("Tags", "Note"), None);
    }

    #[test]
    fn test_instruction_lookup() {
        let schema = SchemaTable::standard();
        assert_eq!(schema.instruction("ton").unwrap().min_args(), 3);
        assert!(schema.instruction("MyAoi").is_none());
        assert!(schema.is_predefined_type("STRING"));
        assert!(schema.is_predefined_type("real"));
    }

    #[test]
    fn test_known_types() {
        let schema = SchemaTable::standard();
        assert!(schema.is_known_type("Message"));
        assert!(schema.is_known_type("AB:1756_DI:I:0"));
        assert!(!schema.is_predefined_type("MESSAGE"));
        assert!(!schema.is_known_type("MyType"));
    }
}

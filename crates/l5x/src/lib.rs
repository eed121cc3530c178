//! L5X - Structural editing of Logix controller project files.
//!
//! Loads an L5X project into an ordered element tree, edits it through
//! transactions that either commit whole or leave the tree untouched, and
//! validates the result before every commit. Tag values are read and written
//! in both of their stored forms, and ladder rung text is parsed rather than
//! pattern matched, so renames reach every real reference and nothing else.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use l5x::project::{Project, RoutineRef};
//! use l5x_core::SchemaTable;
//!
//! let xml = r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="Controller">
//! <Controller Name="Plant">
//! <Tags>
//! <Tag Name="Start" TagType="Base" DataType="BOOL" Radix="Decimal">
//! <Data Format="L5K">
//! <![CDATA[0]]>
//! </Data>
//! <Data Format="Decorated">
//! <DataValue DataType="BOOL" Radix="Decimal" Value="0"/>
//! </Data>
//! </Tag>
//! </Tags>
//! <Programs>
//! <Program Name="MainProgram">
//! <Routines>
//! <Routine Name="MainRoutine" Type="RLL">
//! <RLLContent/>
//! </Routine>
//! </Routines>
//! </Program>
//! </Programs>
//! <Tasks>
//! <Task Name="MainTask" Type="CONTINUOUS"/>
//! </Tasks>
//! </Controller>
//! </RSLogix5000Content>"#;
//!
//! let mut project = Project::parse(xml, Arc::new(SchemaTable::standard())).unwrap();
//! let routine = RoutineRef::program("MainProgram", "MainRoutine");
//! project.add_rung(&routine, "XIC(Start)OTE(Start);", None, None).unwrap();
//!
//! // Undefined tags are caught before the edit lands.
//! assert!(project.add_rung(&routine, "XIC(Missing)OTE(Start);", None, None).is_err());
//! assert!(!project.validate().has_errors());
//! ```

pub mod codec;
pub mod config;
pub mod document;
pub mod project;
pub mod validate;

mod error;

pub use l5x_core::{Dimensions, ElementNode, SchemaTable, TypeDefinition, Value};

pub use error::{L5xError, TransactionError};

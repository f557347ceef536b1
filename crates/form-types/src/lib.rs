//! Shared data model for document-to-form conversion.
//!
//! Every converter, the structure builder and the watermark detector speak in
//! these types. Wire names are camelCase so results can be stored verbatim as a
//! template's form definition.

pub mod conversion;
pub mod field;
pub mod section;
pub mod watermark;

pub use conversion::{ConversionContent, ConversionResult};
pub use field::{
    Accessibility, Bounds, ConditionOperator, FieldCondition, FieldStyle, FieldType, FormField,
    RatingScale, RatingStyle, ValidationKind, ValidationParams, ValidationRule,
};
pub use section::{FormNode, FormSection};
pub use watermark::{WatermarkDetectionResult, WatermarkKind, WatermarkLocation, WatermarkVerdict};

//! Document to form-template converters
//!
//! Every backend implements [`Converter`]: one file in, one
//! [`ConversionResult`](form_types::ConversionResult) out, with failures
//! folded into the result instead of returned as errors. A
//! [`ConverterFactory`] picks the backend by file extension.
//!
//! | converter | formats | backend |
//! |---|---|---|
//! | [`OfficeConverter`] | docx, xlsx | local parsing |
//! | [`InferenceConverter`] | pdf, xlsx, images | layout inference service |
//! | [`OcrConverter`] | pdf | text layer + tesseract (leptess, pdfium) |
//! | [`DocumentAiConverter`] | pdf, docx, xlsx | Google Document AI |
//! | [`AzureConverter`] | pdf | Azure Form Recognizer |
//!
//! # Example
//!
//! ```no_run
//! use form_converters::{ConversionOptions, ConverterConfig, ConverterFactory, WatermarkGate};
//!
//! # async fn example() -> Result<(), form_converters::ConverterError> {
//! let config = ConverterConfig::from_env()?;
//! let gate = WatermarkGate::new(config.watermark_detector()?, config.watermark_policy);
//! let factory = ConverterFactory::with_defaults(&config, Some(gate))?;
//!
//! let result = factory
//!     .convert("forms/intake.docx".as_ref(), &ConversionOptions::default())
//!     .await;
//! println!("{} sections, confidence {:.2}", result.sections.len(), result.confidence);
//! factory.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cloud;
pub mod config;
pub mod converter;
pub mod error;
pub mod factory;
pub mod gate;
pub mod inference;
pub mod normalize;
pub mod ocr;
pub mod office;
pub mod pdf_text;
pub mod pipeline;

pub use batch::{BatchOptions, BatchProcessor, BatchReport};
pub use cloud::{AzureConverter, DocumentAiConverter};
pub use config::ConverterConfig;
pub use converter::{ConversionOptions, Converter};
pub use error::ConverterError;
pub use factory::ConverterFactory;
pub use gate::WatermarkGate;
pub use inference::InferenceConverter;
pub use normalize::{PdfNormalizer, PdfSource};
pub use ocr::{OcrConverter, OcrWord, PageRecognizer};
pub use office::OfficeConverter;

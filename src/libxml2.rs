//! Minimal libxml2 bindings for XML Schema validation.
//!
//! Only the schema-parse and schema-validate entry points are bound. Schema
//! parsing is not thread-safe in libxml2; callers parse through the schema
//! cache, which runs each parse once. Validation creates its own context per
//! call and may run on any thread.

use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_uint, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

static LIBXML2_INIT: Once = Once::new();

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

/// Mirror of libxml2's `xmlError`
#[repr(C)]
pub struct XmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    fn xmlInitParser();
    fn xmlInitGlobals();

    fn xmlSchemaNewMemParserCtxt(buffer: *const c_char, size: c_int)
    -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        handler: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
}

/// A single problem reported by libxml2 while validating a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    /// 1-based line in the document, when libxml2 knows it
    pub line: Option<u32>,
    pub message: String,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

unsafe extern "C" fn collect_error(user_data: *mut c_void, error: *mut XmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }

    let messages = unsafe { &mut *(user_data as *mut Vec<ValidationMessage>) };
    let error = unsafe { &*error };

    if error.message.is_null() {
        return;
    }

    let text = unsafe { CStr::from_ptr(error.message) }
        .to_string_lossy()
        .trim()
        .to_string();

    messages.push(ValidationMessage {
        line: u32::try_from(error.line).ok().filter(|line| *line > 0),
        message: text,
    });
}

/// Shared handle to a parsed schema, freed when the last clone drops
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<SchemaHandle>,
}

#[derive(Debug)]
struct SchemaHandle {
    ptr: *mut XmlSchema,
}

// Parsed schemas are read-only during validation.
unsafe impl Send for SchemaHandle {}
unsafe impl Sync for SchemaHandle {}

impl Drop for SchemaHandle {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlSchemaFree(self.ptr) };
        }
    }
}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }
        Ok(Self {
            inner: Arc::new(SchemaHandle { ptr }),
        })
    }

    fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// Number of live handles sharing this schema
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid {
        error_count: i32,
        messages: Vec<ValidationMessage>,
    },
    InternalError {
        code: i32,
        messages: Vec<ValidationMessage>,
    },
}

impl ValidationResult {
    /// Interpret an `xmlSchemaValidateFile` return code
    pub fn from_code(code: c_int, messages: Vec<ValidationMessage>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                messages,
            },
            n => ValidationResult::InternalError { code: n, messages },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid { messages, .. }
            | ValidationResult::InternalError { messages, .. } => messages,
        }
    }
}

/// Entry point for parsing schemas and validating files
#[derive(Debug, Clone, Copy)]
pub struct LibXml2Wrapper;

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });
        LibXml2Wrapper
    }

    /// Parse an XSD held in memory. Must not run concurrently with another parse.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        let size = c_int::try_from(schema_data.len()).map_err(|_| LibXml2Error::MemoryAllocation)?;

        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(schema_data.as_ptr() as *const c_char, size);
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let schema = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);

            XmlSchemaPtr::from_raw(schema)
        }
    }

    /// Validate the file at `file_path` against `schema`.
    ///
    /// Schema violations come back as [`ValidationResult::Invalid`]; libxml2
    /// internal failures (unreadable file, malformed document) as
    /// [`ValidationResult::InternalError`].
    pub fn validate_file(
        &self,
        schema: &XmlSchemaPtr,
        file_path: &Path,
    ) -> LibXml2Result<ValidationResult> {
        // libxml2 opens the path with the platform's byte-oriented calls
        let c_path = CString::new(file_path.as_os_str().as_encoded_bytes()).map_err(|_| {
            LibXml2Error::ValidationFailed {
                code: -1,
                file: file_path.to_path_buf(),
            }
        })?;

        let mut messages: Vec<ValidationMessage> = Vec::new();

        let code = unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(collect_error),
                &mut messages as *mut Vec<ValidationMessage> as *mut c_void,
            );

            let code = xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0);
            xmlSchemaFreeValidCtxt(valid_ctxt);
            code
        };

        Ok(ValidationResult::from_code(code, messages))
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

//
// dicom_access.rs
// Dicom-Anonymizer-rs
//
// Capability traits over the dicom-rs object model: attribute access for the rewriter and file I/O for the walker.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};

use crate::error::{AttributeError, FileError};

/// Small capability trait the rewriter depends on instead of a concrete DICOM object shape.
pub trait AttributeAccess {
    fn has_attribute(&self, tag: Tag) -> bool;
    fn attribute_str(&self, tag: Tag) -> Option<String>;
    /// Replace the value of an existing attribute, keeping its VR.
    fn set_attribute(&mut self, tag: Tag, value: &str) -> Result<(), AttributeError>;
    /// Keep the attribute but give it a zero-length value.
    fn clear_attribute(&mut self, tag: Tag) -> Result<(), AttributeError>;
}

/// Reads and writes whole records. The walker only talks to files through this.
pub trait DicomCodec {
    type Record: AttributeAccess;

    fn read(&self, path: &Path) -> Result<Self::Record, FileError>;
    fn write(&self, record: &Self::Record, path: &Path) -> Result<(), FileError>;
}

/// Codec backed by `dicom::object::open_file` / `write_to_file`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCodec;

impl DicomCodec for FileCodec {
    type Record = DefaultDicomObject;

    fn read(&self, path: &Path) -> Result<Self::Record, FileError> {
        open_file(path).map_err(|e| FileError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write(&self, record: &Self::Record, path: &Path) -> Result<(), FileError> {
        record.write_to_file(path).map_err(|e| FileError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// VRs whose values are character strings and can take a textual replacement.
pub fn is_textual_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::AE
            | VR::AS
            | VR::CS
            | VR::DA
            | VR::DS
            | VR::DT
            | VR::IS
            | VR::LO
            | VR::LT
            | VR::PN
            | VR::SH
            | VR::ST
            | VR::TM
            | VR::UC
            | VR::UI
            | VR::UR
            | VR::UT
    )
}

fn textual_vr_of(obj: &InMemDicomObject<StandardDataDictionary>, tag: Tag) -> Result<VR, AttributeError> {
    let element = obj.element(tag).map_err(|_| AttributeError::Missing { tag })?;
    let vr = element.header().vr;
    if is_textual_vr(vr) {
        Ok(vr)
    } else {
        Err(AttributeError::IncompatibleVr { tag, vr })
    }
}

impl AttributeAccess for InMemDicomObject<StandardDataDictionary> {
    fn has_attribute(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }

    fn attribute_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.trim_end().to_string())
    }

    fn set_attribute(&mut self, tag: Tag, value: &str) -> Result<(), AttributeError> {
        let vr = textual_vr_of(self, tag)?;
        self.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
        Ok(())
    }

    fn clear_attribute(&mut self, tag: Tag) -> Result<(), AttributeError> {
        let vr = textual_vr_of(self, tag)?;
        self.put(DataElement::new(tag, vr, PrimitiveValue::Empty));
        Ok(())
    }
}

impl AttributeAccess for DefaultDicomObject {
    fn has_attribute(&self, tag: Tag) -> bool {
        (**self).has_attribute(tag)
    }

    fn attribute_str(&self, tag: Tag) -> Option<String> {
        (**self).attribute_str(tag)
    }

    fn set_attribute(&mut self, tag: Tag, value: &str) -> Result<(), AttributeError> {
        (**self).set_attribute(tag, value)
    }

    fn clear_attribute(&mut self, tag: Tag) -> Result<(), AttributeError> {
        (**self).clear_attribute(tag)
    }
}

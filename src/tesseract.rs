use crate::consensus::Recognizer;
use image::GrayImage;
use leptess::tesseract::TessApi;
use std::ffi::CString;

/// Tesseract restricted to plate characters, single text line.
pub struct TesseractRecognizer {
    api: TessApi,
}

// TessApi holds raw pointers; each pipeline owns its own instance and only
// touches it from the pipeline thread.
unsafe impl Send for TesseractRecognizer {}

impl TesseractRecognizer {
    pub fn new(data_path: &str, lang: &str) -> Result<Self, failure::Error> {
        let mut api = TessApi::new(Some(data_path), lang)
            .map_err(|e| format_err!("Unable to init tesseract ({}, {}): {:?}", data_path, lang, e))?;
        set_variable(&mut api, "tessedit_char_whitelist", "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789")?;
        set_variable(&mut api, "tessedit_pageseg_mode", "7")?;
        Ok(TesseractRecognizer { api })
    }
}

fn set_variable(api: &mut TessApi, name: &str, value: &str) -> Result<(), failure::Error> {
    api.raw
        .set_variable(&CString::new(name)?, &CString::new(value)?)
        .map_err(|e| format_err!("Unable to set {}: {:?}", name, e))
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&mut self, region: &GrayImage) -> Result<String, failure::Error> {
        let (width, height) = region.dimensions();
        self.api
            .raw
            .set_image(
                region.as_raw(),
                width as i32,
                height as i32,
                1,
                width as i32,
            )
            .map_err(|e| format_err!("Unable to set image: {:?}", e))?;
        self.api
            .get_utf8_text()
            .map(|text| text.trim().to_string())
            .map_err(|e| format_err!("Recognition failed: {:?}", e))
    }
}

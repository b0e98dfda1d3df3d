//! PDF backend.
//!
//! A document is exposed as one synthetic entry per page, named
//! `"1.png" .. "<n>.png"`. A page's payload is the page itself serialized as
//! a single-page PDF document; rasterizing is the decode layer's business,
//! the payload stays an opaque byte blob here.

use std::path::PathBuf;

use lopdf::Document;

use crate::archive::ContainerSource;
use crate::error::{Error, Result};

pub(crate) struct PdfBackend {
    source: ContainerSource,
}

impl PdfBackend {
    pub(crate) fn new(source: ContainerSource) -> Self {
        Self { source }
    }

    fn load(&self) -> Result<Document> {
        let doc = match self.source.data() {
            Some(bytes) => Document::load_mem(bytes),
            None => Document::load(self.source.path()),
        };
        doc.map_err(|e| {
            Error::Archive(format!(
                "failed to open pdf {}: {e}",
                self.source.path().display()
            ))
        })
    }

    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let doc = self.load()?;
        let pages = doc.get_pages().len();
        Ok((1..=pages).map(|n| PathBuf::from(format!("{n}.png"))).collect())
    }

    pub(crate) fn extract_page(&self, index: usize) -> Result<Vec<u8>> {
        let doc = self.load()?;
        single_page(&doc, index)
    }

    /// One document load serves the whole range.
    pub(crate) fn extract_pages(&self, start: usize, count: usize) -> Result<Vec<Vec<u8>>> {
        let doc = self.load()?;
        (start..start + count).map(|i| single_page(&doc, i)).collect()
    }
}

fn single_page(doc: &Document, index: usize) -> Result<Vec<u8>> {
    let total = doc.get_pages().len() as u32;
    let page_no = index as u32 + 1;
    if page_no > total {
        return Err(Error::Extraction(format!(
            "page {page_no} out of range ({total} pages)"
        )));
    }

    let mut single = doc.clone();
    let others: Vec<u32> = (1..=total).filter(|&n| n != page_no).collect();
    single.delete_pages(&others);
    single.prune_objects();

    let mut buf = Vec::new();
    single
        .save_to(&mut buf)
        .map_err(|e| Error::Extraction(format!("failed to serialize pdf page {page_no}: {e}")))?;
    Ok(buf)
}

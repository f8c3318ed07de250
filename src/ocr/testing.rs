//! Fake OCR engines for unit tests.

use anyhow::Result;
use image::GrayImage;
use std::cell::{Cell, RefCell};

use super::engine::{OcrEngine, Whitelist};

/// Replies in order, then returns empty text.
pub struct ScriptedEngine {
    replies: RefCell<Vec<Result<String>>>,
    pub calls: Cell<usize>,
}

impl ScriptedEngine {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().rev().collect()),
            calls: Cell::new(0),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&self, _img: &GrayImage, _whitelist: Whitelist) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.replies
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Cycles through fixed replies, separately per whitelist.
pub struct CyclingEngine {
    drivers: Vec<String>,
    sectors: Vec<String>,
    driver_calls: Cell<usize>,
    sector_calls: Cell<usize>,
}

impl CyclingEngine {
    pub fn new(drivers: &[&str], sectors: &[&str]) -> Self {
        Self {
            drivers: drivers.iter().map(|s| s.to_string()).collect(),
            sectors: sectors.iter().map(|s| s.to_string()).collect(),
            driver_calls: Cell::new(0),
            sector_calls: Cell::new(0),
        }
    }

    pub fn driver_calls(&self) -> usize {
        self.driver_calls.get()
    }
}

impl OcrEngine for CyclingEngine {
    fn recognize(&self, _img: &GrayImage, whitelist: Whitelist) -> Result<String> {
        let (replies, counter) = match whitelist {
            Whitelist::DriverCode => (&self.drivers, &self.driver_calls),
            Whitelist::SectorTime => (&self.sectors, &self.sector_calls),
        };
        let n = counter.get();
        counter.set(n + 1);
        if replies.is_empty() {
            return Ok(String::new());
        }
        Ok(replies[n % replies.len()].clone())
    }
}

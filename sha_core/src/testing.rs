//! An in-memory [`AvailabilitySource`] for tests.

use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    sync::atomic::{AtomicUsize, Ordering},
};

use image::{ImageFormat, Rgba, RgbaImage};

use crate::{
    amis_client::{AvailabilitySource, ObjectId},
    error::FetchError,
    weekday::{DateKey, HallId},
};

pub const IMAGE_WIDTH: u32 = 40;
pub const IMAGE_HEIGHT: u32 = 10;
pub const HEADER_HEIGHT: u32 = 6;
pub const FOOTER_HEIGHT: u32 = 4;

pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[derive(Debug, Default)]
pub struct FakeSource {
    schema_calls: AtomicUsize,
    failing_dates: HashSet<DateKey>,
    failing_decorations: bool,
    hall_names: HashMap<HallId, String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, date: DateKey) -> Self {
        self.failing_dates.insert(date);
        self
    }

    pub fn without_decorations(mut self) -> Self {
        self.failing_decorations = true;
        self
    }

    pub fn with_hall_name(mut self, hall_id: HallId, name: &str) -> Self {
        self.hall_names.insert(hall_id, String::from(name));
        self
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }
}

impl AvailabilitySource for FakeSource {
    async fn fetch_schema(
        &self,
        object: ObjectId,
        date: Option<DateKey>,
    ) -> Result<Vec<u8>, FetchError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        let failed = match (object, date) {
            (ObjectId::Hall(_), Some(date)) => self.failing_dates.contains(&date),
            (ObjectId::Hall(_), None) => true,
            _ => self.failing_decorations,
        };
        if failed {
            return Err(FetchError::Status {
                object: object.to_string(),
                status: 500,
            });
        }
        Ok(match object {
            ObjectId::Hall(_) => png(IMAGE_WIDTH, IMAGE_HEIGHT, [0, 128, 0, 255]),
            ObjectId::Header => png(IMAGE_WIDTH, HEADER_HEIGHT, [0, 0, 0, 255]),
            ObjectId::Footer => png(IMAGE_WIDTH, FOOTER_HEIGHT, [0, 0, 0, 255]),
        })
    }

    async fn fetch_hall_info(&self, hall_id: HallId) -> Result<String, FetchError> {
        match self.hall_names.get(&hall_id) {
            Some(name) => Ok(format!(
                "<html><body><address><strong>{name}</strong><br>Utrecht</address></body></html>"
            )),
            None => Err(FetchError::Status {
                object: hall_id.to_string(),
                status: 404,
            }),
        }
    }
}

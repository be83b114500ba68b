//! Enquiries service
//!
//! Booking enquiries and the admin's replies to them. Every change goes
//! through the synchronizer so the enquiry file stays current.

use crate::database::{Enquiry, EnquiryStatus, NewEnquiry};
use crate::error::Result;
use crate::services::synchronizer::Synchronizer;
use chrono::Utc;

/// Service for managing enquiries
#[derive(Clone)]
pub struct EnquiryService {
    sync: Synchronizer,
}

impl EnquiryService {
    pub fn new(sync: Synchronizer) -> Self {
        Self { sync }
    }

    /// All enquiries in submission order
    pub async fn get_enquiries(&self) -> Result<Vec<Enquiry>> {
        self.sync.read().await
    }

    /// Store a new enquiry. It always starts out pending.
    pub async fn save_enquiry(&self, req: NewEnquiry) -> Result<Enquiry> {
        let enquiry = Enquiry::create(req);
        tracing::info!("Saving enquiry {} from {}", enquiry.id, enquiry.name);

        let saved = enquiry.clone();
        self.sync
            .mutate(move |records: &mut Vec<Enquiry>| {
                records.push(enquiry);
                Some(())
            })
            .await?;

        Ok(saved)
    }

    /// Mark an enquiry pending or contacted
    pub async fn update_enquiry_status(&self, id: &str, status: EnquiryStatus) -> Result<bool> {
        tracing::debug!("Setting enquiry {} to {:?}", id, status);
        self.modify(id, |enquiry| enquiry.status = status).await
    }

    /// Attach the admin's reply, stamped with the current time
    pub async fn add_enquiry_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.set_reply(id, reply).await
    }

    /// Replace the admin's reply and its date
    pub async fn update_enquiry_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.set_reply(id, reply).await
    }

    /// Clear the reply and its date
    pub async fn delete_enquiry_reply(&self, id: &str) -> Result<bool> {
        self.modify(id, |enquiry| {
            enquiry.admin_reply = None;
            enquiry.admin_reply_date = None;
        })
        .await
    }

    /// Remove an enquiry. Returns false when the id is unknown.
    pub async fn delete_enquiry(&self, id: &str) -> Result<bool> {
        tracing::info!("Deleting enquiry: {}", id);

        let removed = self
            .sync
            .mutate(|records: &mut Vec<Enquiry>| {
                let index = records.iter().position(|e| e.id == id)?;
                records.remove(index);
                Some(())
            })
            .await?;

        Ok(removed.is_some())
    }

    /// Replace every enquiry with the contents of an uploaded file
    pub async fn import_enquiries(&self, json: &str) -> Result<usize> {
        self.sync.import_collection::<Enquiry>(json).await
    }

    async fn set_reply(&self, id: &str, reply: String) -> Result<bool> {
        self.modify(id, |enquiry| {
            enquiry.admin_reply = Some(reply);
            enquiry.admin_reply_date = Some(Utc::now());
        })
        .await
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Enquiry),
    {
        let found = self
            .sync
            .mutate(|records: &mut Vec<Enquiry>| {
                let enquiry = records.iter_mut().find(|e| e.id == id)?;
                change(enquiry);
                Some(())
            })
            .await?;

        if found.is_none() {
            tracing::warn!("Enquiry not found: {}", id);
        }
        Ok(found.is_some())
    }
}

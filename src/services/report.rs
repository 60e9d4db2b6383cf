//! Membership reports
//!
//! The admin back-office can export paper copies of membership records:
//! one PDF form per member, bundled into a single zip for download.

use crate::models::User;
use anyhow::Context;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Error types for report generation
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to render PDF: {0}")]
    Pdf(String),

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Membership report generator
pub struct ReportGenerator;

impl ReportGenerator {
    /// Render a single member's record as a one-page PDF form.
    pub fn member_form_pdf(user: &User) -> Result<Vec<u8>, ReportError> {
        // US Letter, in millimeters
        let (doc, page, layer) = PdfDocument::new(
            format!("Membership Record - {}", user.name),
            Mm(215.9),
            Mm(279.4),
            "Form",
        );

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(e.to_string()))?;

        let layer = doc.get_page(page).get_layer(layer);

        layer.use_text("Membership Record", 18.0, Mm(20.0), Mm(255.0), &bold);

        let paid_on = user
            .membership_paid_on
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| "-".to_string());

        let lines = [
            ("Name", user.name.clone()),
            ("NetID", user.netid.clone()),
            ("Email", user.email.clone()),
            ("Class standing", user.standing.clone()),
            ("Major", user.major.clone()),
            ("Shirt size", user.shirt_size.clone()),
            ("Membership status", user.membership_status.label().to_string()),
            ("Dues paid on", paid_on),
        ];

        let mut y = 240.0;
        for (label, value) in lines {
            layer.use_text(format!("{}:", label), 11.0, Mm(20.0), Mm(y), &bold);
            layer.use_text(value, 11.0, Mm(70.0), Mm(y), &font);
            y -= 9.0;
        }

        let signed = if user.signature.is_some() {
            "Signature on file"
        } else {
            "No signature on file"
        };
        layer.use_text(signed, 10.0, Mm(20.0), Mm(y - 6.0), &font);

        doc.save_to_bytes()
            .map_err(|e| ReportError::Pdf(e.to_string()))
    }

    /// Bundle one PDF per member into a zip archive.
    pub fn membership_bundle(users: &[User]) -> Result<Vec<u8>, ReportError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for user in users {
            let pdf = Self::member_form_pdf(user)?;
            writer.start_file(format!("{}.pdf", user.netid), options)?;
            writer
                .write_all(&pdf)
                .context("Failed to write archive entry")?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::test_user;
    use crate::models::MembershipStatus;
    use chrono::Utc;

    #[test]
    fn test_member_form_is_a_pdf() {
        let user = test_user("Grace Hopper", "ghopp001");
        let pdf = ReportGenerator::member_form_pdf(&user).expect("Failed to render");

        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.len() > 500);
    }

    #[test]
    fn test_member_form_handles_paid_member() {
        let mut user = test_user("Grace Hopper", "ghopp001");
        user.membership_status = MembershipStatus::Paid;
        user.membership_paid_on = Some(Utc::now());

        ReportGenerator::member_form_pdf(&user).expect("Failed to render paid member");
    }

    #[test]
    fn test_bundle_contains_one_pdf_per_member() {
        let users = vec![
            test_user("Grace Hopper", "ghopp001"),
            test_user("Alan Turing", "aturi001"),
        ];

        let bundle = ReportGenerator::membership_bundle(&users).expect("Failed to bundle");

        let mut archive =
            zip::ZipArchive::new(Cursor::new(bundle)).expect("Bundle should be a zip");
        assert_eq!(archive.len(), 2);

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"ghopp001.pdf".to_string()));
        assert!(names.contains(&"aturi001.pdf".to_string()));
    }

    #[test]
    fn test_empty_bundle_is_valid_zip() {
        let bundle = ReportGenerator::membership_bundle(&[]).expect("Failed to bundle");
        let archive = zip::ZipArchive::new(Cursor::new(bundle)).expect("Should be a zip");
        assert_eq!(archive.len(), 0);
    }
}

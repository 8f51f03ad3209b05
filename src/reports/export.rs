/// Report export formats
///
/// Exports are thin renderings of a `ReportDocument` table model: CSV via
/// the csv crate, Excel as the SpreadsheetML 2003 XML dialect, PDF as a
/// minimal single-page text document. Fidelity of the office formats is
/// out of scope; content-type and attachment semantics are not.
use crate::error::{ApiError, ApiResult};

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Excel,
    Pdf,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "excel" | "xls" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ApiError::Validation(format!("Invalid export format: {}", s))),
        }
    }

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xls",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
        }
    }

    /// Get MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "application/vnd.ms-excel",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// One titled table within a report
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The renderer-independent report model
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub sections: Vec<ReportSection>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn push_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    /// Render to the requested format
    pub fn render(&self, format: ExportFormat) -> ApiResult<Vec<u8>> {
        match format {
            ExportFormat::Csv => self.render_csv(),
            ExportFormat::Excel => Ok(self.render_excel()),
            ExportFormat::Pdf => Ok(self.render_pdf()),
        }
    }

    /// Attachment filename for this document
    pub fn filename(&self, format: ExportFormat) -> String {
        let stem: String = self
            .title
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}.{}", stem.to_lowercase(), format.extension())
    }

    fn render_csv(&self) -> ApiResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        for section in &self.sections {
            writer
                .write_record([section.title.as_str()])
                .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
            writer
                .write_record(&section.headers)
                .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
            for row in &section.rows {
                writer
                    .write_record(row)
                    .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
            }
            writer
                .write_record([""])
                .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| ApiError::Internal(format!("CSV finalize failed: {}", e)))
    }

    /// SpreadsheetML 2003: one worksheet per section
    fn render_excel(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\"?>\n");
        out.push_str("<?mso-application progid=\"Excel.Sheet\"?>\n");
        out.push_str(
            "<Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\"\n \
             xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n",
        );

        for (index, section) in self.sections.iter().enumerate() {
            out.push_str(&format!(
                "<Worksheet ss:Name=\"{}\">\n<Table>\n",
                xml_escape(&worksheet_name(&section.title, index))
            ));

            out.push_str("<Row>");
            for header in &section.headers {
                out.push_str(&format!(
                    "<Cell><Data ss:Type=\"String\">{}</Data></Cell>",
                    xml_escape(header)
                ));
            }
            out.push_str("</Row>\n");

            for row in &section.rows {
                out.push_str("<Row>");
                for cell in row {
                    out.push_str(&format!(
                        "<Cell><Data ss:Type=\"String\">{}</Data></Cell>",
                        xml_escape(cell)
                    ));
                }
                out.push_str("</Row>\n");
            }

            out.push_str("</Table>\n</Worksheet>\n");
        }

        out.push_str("</Workbook>\n");
        out.into_bytes()
    }

    /// Minimal single-page PDF: title plus tab-separated section tables
    fn render_pdf(&self) -> Vec<u8> {
        let mut lines = vec![self.title.clone(), String::new()];
        for section in &self.sections {
            lines.push(section.title.clone());
            lines.push(section.headers.join("  |  "));
            for row in &section.rows {
                lines.push(row.join("  |  "));
            }
            lines.push(String::new());
        }

        let mut content = String::from("BT\n/F1 10 Tf\n50 780 Td\n12 TL\n");
        for line in &lines {
            content.push_str(&format!("({}) Tj\nT*\n", pdf_escape(line)));
        }
        content.push_str("ET\n");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_start = out.len();
        out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
        out.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            out.push_str(&format!("{:010} 00000 n \n", offset));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        ));

        out.into_bytes()
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn pdf_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Worksheet names are capped at 31 chars and must be unique
fn worksheet_name(title: &str, index: usize) -> String {
    let mut name: String = title.chars().take(28).collect();
    if name.is_empty() {
        name = format!("Sheet{}", index + 1);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReportDocument {
        let mut document = ReportDocument::new("Student report: Alice");
        document.push_section(ReportSection {
            title: "Credits".to_string(),
            headers: vec!["Activity".to_string(), "Status".to_string()],
            rows: vec![vec!["Math Olympiad".to_string(), "validated".to_string()]],
        });
        document
    }

    #[test]
    fn format_parsing_and_metadata() {
        assert_eq!(ExportFormat::from_str("excel").unwrap(), ExportFormat::Excel);
        assert_eq!(ExportFormat::from_str("PDF").unwrap(), ExportFormat::Pdf);
        assert!(ExportFormat::from_str("docx").is_err());

        assert_eq!(ExportFormat::Excel.mime_type(), "application/vnd.ms-excel");
        assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
    }

    #[test]
    fn csv_contains_rows() {
        let bytes = sample().render(ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Math Olympiad"));
        assert!(text.contains("Credits"));
    }

    #[test]
    fn excel_is_spreadsheetml() {
        let bytes = sample().render(ExportFormat::Excel).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<Workbook"));
        assert!(text.contains("Math Olympiad"));
    }

    #[test]
    fn pdf_has_header_and_trailer() {
        let bytes = sample().render(ExportFormat::Pdf).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("Math Olympiad"));
    }

    #[test]
    fn filename_is_sanitized() {
        let name = sample().filename(ExportFormat::Pdf);
        assert_eq!(name, "student_report__alice.pdf");
    }
}

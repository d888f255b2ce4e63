use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomerp_core::{DocumentId, DomainResult, ItemId, Segment};
use loomerp_infra::services::{DocumentDraft, DraftLine, InvoiceDraft, InvoiceDraftLine};
use loomerp_inventory::{NewItem, UnitCode, UnitConversion};
use loomerp_purchasing::PurchaseInvoice;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub code: String,
    pub name: String,
    pub group: Option<String>,
    pub color: Option<String>,
    pub stock_unit: String,
    pub packing_unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversionRequest {
    pub from: String,
    pub to: String,
    pub factor: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DocumentLineRequest {
    pub item_id: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub remarks: Option<String>,
}

/// Body shared by the four stock document kinds.
#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub document_no: String,
    pub date: NaiveDate,
    pub counterparty: String,
    pub segment: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
    /// Goods receipt for purchase returns, delivery order for sales returns.
    #[serde(alias = "goods_receipt_id", alias = "delivery_order_id")]
    pub reference_id: Option<String>,
    pub lines: Vec<DocumentLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceLineRequest {
    pub item_id: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub invoice_no: String,
    pub date: NaiveDate,
    pub supplier: String,
    pub segment: Option<String>,
    #[serde(default)]
    pub goods_receipt_ids: Vec<String>,
    pub lines: Vec<InvoiceLineRequest>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct SegmentQuery {
    pub segment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub segment: Option<String>,
    pub warehouse: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub quantity: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Purchase invoice with its computed total.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: PurchaseInvoice,
    pub total: Decimal,
}

impl InvoiceResponse {
    pub fn from_invoice(invoice: PurchaseInvoice) -> DomainResult<Self> {
        let total = invoice.total()?;
        Ok(Self { invoice, total })
    }
}

// -------------------------
// Mapping
// -------------------------

fn optional_unit(raw: Option<String>) -> DomainResult<Option<UnitCode>> {
    raw.filter(|u| !u.trim().is_empty()).map(UnitCode::new).transpose()
}

impl CreateItemRequest {
    pub fn into_new_item(self) -> DomainResult<NewItem> {
        Ok(NewItem {
            code: self.code,
            name: self.name,
            group: self.group,
            color: self.color,
            stock_unit: UnitCode::new(self.stock_unit)?,
            packing_unit: optional_unit(self.packing_unit)?,
        })
    }
}

impl CreateConversionRequest {
    pub fn into_conversion(self) -> DomainResult<UnitConversion> {
        UnitConversion::new(UnitCode::new(self.from)?, UnitCode::new(self.to)?, self.factor)
    }
}

impl CreateDocumentRequest {
    pub fn into_draft(self, segment: Segment) -> DomainResult<DocumentDraft> {
        let reference_id = self
            .reference_id
            .as_deref()
            .map(str::parse::<DocumentId>)
            .transpose()?;

        let lines = self
            .lines
            .into_iter()
            .map(|line| {
                Ok(DraftLine {
                    item_id: line.item_id.parse::<ItemId>()?,
                    quantity: line.quantity,
                    unit: optional_unit(line.unit)?,
                    remarks: line.remarks,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(DocumentDraft {
            document_no: self.document_no,
            date: self.date,
            counterparty: self.counterparty,
            segment,
            warehouse: self.warehouse,
            remarks: self.remarks,
            reference_id,
            lines,
        })
    }
}

impl CreateInvoiceRequest {
    pub fn into_draft(self, segment: Segment) -> DomainResult<InvoiceDraft> {
        let goods_receipt_ids = self
            .goods_receipt_ids
            .iter()
            .map(|id| id.parse::<DocumentId>())
            .collect::<DomainResult<Vec<_>>>()?;

        let lines = self
            .lines
            .into_iter()
            .map(|line| {
                Ok(InvoiceDraftLine {
                    item_id: line.item_id.parse::<ItemId>()?,
                    quantity: line.quantity,
                    rate: line.rate,
                    unit: optional_unit(line.unit)?,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(InvoiceDraft {
            invoice_no: self.invoice_no,
            date: self.date,
            supplier: self.supplier,
            segment,
            goods_receipt_ids,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomerp_core::DomainError;
    use serde_json::json;

    #[test]
    fn document_request_accepts_reference_aliases() {
        let grn = DocumentId::new();
        let item = ItemId::new();
        let req: CreateDocumentRequest = serde_json::from_value(json!({
            "document_no": "PR-1",
            "date": "2024-01-15",
            "counterparty": "Sapphire Mills",
            "goods_receipt_id": grn.to_string(),
            "lines": [{ "item_id": item.to_string(), "quantity": "12.5", "unit": "roll" }]
        }))
        .unwrap();

        let draft = req.into_draft(Segment::default()).unwrap();
        assert_eq!(draft.reference_id, Some(grn));
        assert_eq!(draft.lines[0].item_id, item);
        assert_eq!(draft.lines[0].quantity, Decimal::new(125, 1));
        assert_eq!(draft.lines[0].unit.as_ref().map(UnitCode::as_str), Some("ROLL"));
    }

    #[test]
    fn malformed_item_id_is_an_invalid_id() {
        let req: CreateDocumentRequest = serde_json::from_value(json!({
            "document_no": "GRN-1",
            "date": "2024-01-10",
            "counterparty": "Sapphire Mills",
            "lines": [{ "item_id": "not-a-uuid", "quantity": 1 }]
        }))
        .unwrap();

        let err = req.into_draft(Segment::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }

    #[test]
    fn invoice_response_carries_the_total() {
        let invoice = PurchaseInvoice::new(
            DocumentId::new(),
            "PI-1".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            "Sapphire Mills".to_string(),
            Segment::default(),
            vec![],
            vec![loomerp_purchasing::InvoiceLine {
                item_id: ItemId::new(),
                quantity: Decimal::new(120, 0),
                rate: Decimal::new(955, 1),
            }],
        )
        .unwrap();

        let body = serde_json::to_value(InvoiceResponse::from_invoice(invoice).unwrap()).unwrap();
        assert_eq!(body["invoice_no"], "PI-1");
        assert_eq!(body["total"], "11460.0");
    }
}

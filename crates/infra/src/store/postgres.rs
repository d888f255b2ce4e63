//! Postgres-backed document store.
//!
//! All four stock document kinds share `stock_documents` / `stock_document_lines`
//! with a `kind` discriminator; purchase invoices have their own tables.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (foreign key violation) | `23503` | `Domain(Validation)` |
//! | Database (other) | Any other | `Database` |
//! | Other | N/A | `Database` |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use loomerp_core::{DocumentId, DomainError, ItemId, Segment};
use loomerp_inventory::{
    DocumentHeader, Item, MovementSource, StockDocument, StockLine, UnitCode, UnitConversion,
};
use loomerp_purchasing::{GoodsReceipt, InvoiceLine, PurchaseInvoice, PurchaseReturn};
use loomerp_sales::{DeliveryOrder, SalesReturn};

use super::{DocumentFilter, DocumentStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres document store. Owns the connection pool; clone the store (or wrap
/// it in `Arc`) to share it between request handlers.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema (idempotent).
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn insert_stock_document(
        &self,
        kind: MovementSource,
        header: &DocumentHeader,
        reference_id: Option<DocumentId>,
        lines: &[StockLine],
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO stock_documents (
                id, kind, document_no, doc_date, counterparty,
                segment, warehouse, remarks, reference_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(header.id.as_uuid())
        .bind(kind.as_str())
        .bind(&header.document_no)
        .bind(header.date)
        .bind(&header.counterparty)
        .bind(header.segment.as_str())
        .bind(header.warehouse.as_deref())
        .bind(header.remarks.as_deref())
        .bind(reference_id.map(Uuid::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock_document", e))?;

        insert_stock_lines(&mut tx, header.id, lines).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    /// Load documents of one kind in insertion order.
    async fn load_stock_documents(
        &self,
        kind: MovementSource,
        filter: &DocumentFilter,
    ) -> StoreResult<Vec<DocumentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_no, doc_date, counterparty, segment,
                   warehouse, remarks, reference_id
            FROM stock_documents d
            WHERE d.kind = $1
              AND d.segment = $2
              AND ($3::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM stock_document_lines l
                    WHERE l.document_id = d.id AND l.item_id = $3
              ))
            ORDER BY d.seq
            "#,
        )
        .bind(kind.as_str())
        .bind(filter.segment.as_str())
        .bind(filter.item_id.map(Uuid::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stock_documents", e))?;

        self.attach_lines(rows).await
    }

    async fn load_stock_documents_where(
        &self,
        kind: MovementSource,
        column: DocumentKey,
        ids: &[DocumentId],
    ) -> StoreResult<Vec<DocumentRecord>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = match column {
            DocumentKey::Id => {
                r#"
                SELECT id, document_no, doc_date, counterparty, segment,
                       warehouse, remarks, reference_id
                FROM stock_documents
                WHERE kind = $1 AND id = ANY($2)
                ORDER BY seq
                "#
            }
            DocumentKey::Reference => {
                r#"
                SELECT id, document_no, doc_date, counterparty, segment,
                       warehouse, remarks, reference_id
                FROM stock_documents
                WHERE kind = $1 AND reference_id = ANY($2)
                ORDER BY seq
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(kind.as_str())
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_stock_documents_where", e))?;

        self.attach_lines(rows).await
    }

    async fn attach_lines(&self, rows: Vec<PgRow>) -> StoreResult<Vec<DocumentRecord>> {
        let mut records = rows
            .iter()
            .map(DocumentRecord::from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        if records.is_empty() {
            return Ok(records);
        }

        let ids: Vec<Uuid> = records.iter().map(|r| *r.header.id.as_uuid()).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT document_id, item_id, quantity, remarks
            FROM stock_document_lines
            WHERE document_id = ANY($1)
            ORDER BY document_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stock_document_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<StockLine>> = HashMap::new();
        for row in &line_rows {
            let document_id: Uuid = row.try_get("document_id").map_err(corrupt)?;
            lines.entry(document_id).or_default().push(StockLine {
                item_id: ItemId::from_uuid(row.try_get("item_id").map_err(corrupt)?),
                quantity: row.try_get("quantity").map_err(corrupt)?,
                remarks: row.try_get("remarks").map_err(corrupt)?,
            });
        }

        for record in &mut records {
            record.lines = lines.remove(record.header.id.as_uuid()).unwrap_or_default();
        }
        Ok(records)
    }

    async fn load_invoice_lines(
        &self,
        ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, Vec<InvoiceLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT invoice_id, item_id, quantity, rate
            FROM purchase_invoice_lines
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, line_no
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_purchase_invoice_lines", e))?;

        let mut out: HashMap<Uuid, Vec<InvoiceLine>> = HashMap::new();
        for row in &rows {
            let invoice_id: Uuid = row.try_get("invoice_id").map_err(corrupt)?;
            out.entry(invoice_id).or_default().push(InvoiceLine {
                item_id: ItemId::from_uuid(row.try_get("item_id").map_err(corrupt)?),
                quantity: row.try_get("quantity").map_err(corrupt)?,
                rate: row.try_get("rate").map_err(corrupt)?,
            });
        }
        Ok(out)
    }

    async fn invoices_from_rows(&self, rows: Vec<PgRow>) -> StoreResult<Vec<PurchaseInvoice>> {
        let ids = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id").map_err(corrupt))
            .collect::<StoreResult<Vec<_>>>()?;
        let mut lines = self.load_invoice_lines(&ids).await?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(corrupt)?;
                let segment: String = row.try_get("segment").map_err(corrupt)?;
                let receipts: Vec<Uuid> = row.try_get("goods_receipt_ids").map_err(corrupt)?;
                Ok(PurchaseInvoice {
                    id: DocumentId::from_uuid(id),
                    invoice_no: row.try_get("invoice_no").map_err(corrupt)?,
                    date: row.try_get("invoice_date").map_err(corrupt)?,
                    supplier: row.try_get("supplier").map_err(corrupt)?,
                    segment: Segment::new(segment).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    goods_receipt_ids: receipts.into_iter().map(DocumentId::from_uuid).collect(),
                    lines: lines.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum DocumentKey {
    Id,
    Reference,
}

/// A stock document row plus its lines, before it is typed by kind.
#[derive(Debug)]
struct DocumentRecord {
    header: DocumentHeader,
    reference_id: Option<DocumentId>,
    lines: Vec<StockLine>,
}

impl DocumentRecord {
    fn from_row(row: &PgRow) -> StoreResult<Self> {
        let segment: String = row.try_get("segment").map_err(corrupt)?;
        let date: NaiveDate = row.try_get("doc_date").map_err(corrupt)?;
        let reference_id: Option<Uuid> = row.try_get("reference_id").map_err(corrupt)?;
        Ok(Self {
            header: DocumentHeader {
                id: DocumentId::from_uuid(row.try_get("id").map_err(corrupt)?),
                document_no: row.try_get("document_no").map_err(corrupt)?,
                date,
                counterparty: row.try_get("counterparty").map_err(corrupt)?,
                segment: Segment::new(segment).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                warehouse: row.try_get("warehouse").map_err(corrupt)?,
                remarks: row.try_get("remarks").map_err(corrupt)?,
            },
            reference_id: reference_id.map(DocumentId::from_uuid),
            lines: Vec::new(),
        })
    }
}

impl From<DocumentRecord> for GoodsReceipt {
    fn from(r: DocumentRecord) -> Self {
        GoodsReceipt { header: r.header, lines: r.lines }
    }
}

impl From<DocumentRecord> for PurchaseReturn {
    fn from(r: DocumentRecord) -> Self {
        PurchaseReturn {
            header: r.header,
            goods_receipt_id: r.reference_id,
            lines: r.lines,
        }
    }
}

impl From<DocumentRecord> for DeliveryOrder {
    fn from(r: DocumentRecord) -> Self {
        DeliveryOrder { header: r.header, lines: r.lines }
    }
}

impl From<DocumentRecord> for SalesReturn {
    fn from(r: DocumentRecord) -> Self {
        SalesReturn {
            header: r.header,
            delivery_order_id: r.reference_id,
            lines: r.lines,
        }
    }
}

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let stock_unit: String = row.try_get("stock_unit").map_err(corrupt)?;
    let packing_unit: Option<String> = row.try_get("packing_unit").map_err(corrupt)?;
    Ok(Item {
        id: ItemId::from_uuid(row.try_get("id").map_err(corrupt)?),
        code: row.try_get("code").map_err(corrupt)?,
        name: row.try_get("name").map_err(corrupt)?,
        group: row.try_get("item_group").map_err(corrupt)?,
        color: row.try_get("color").map_err(corrupt)?,
        stock_unit: UnitCode::new(stock_unit).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        packing_unit: packing_unit
            .map(UnitCode::new)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
    })
}

async fn insert_stock_lines(
    tx: &mut Transaction<'_, Postgres>,
    document_id: DocumentId,
    lines: &[StockLine],
) -> StoreResult<()> {
    for (idx, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO stock_document_lines (document_id, line_no, item_id, quantity, remarks)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(document_id.as_uuid())
        .bind(idx as i32 + 1)
        .bind(line.item_id.as_uuid())
        .bind(line.quantity)
        .bind(line.remarks.as_deref())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock_document_line", e))?;
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, item), fields(item_id = %item.id, code = %item.code))]
    async fn insert_item(&self, item: Item) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, code, name, item_group, color, stock_unit, packing_unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.group.as_deref())
        .bind(item.color.as_deref())
        .bind(item.stock_unit.as_str())
        .bind(item.packing_unit.as_ref().map(UnitCode::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, item_group, color, stock_unit, packing_unit
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, name, item_group, color, stock_unit, packing_unit
            FROM items
            ORDER BY created_at, code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn upsert_conversion(&self, conversion: UnitConversion) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM unit_conversions WHERE from_unit = $1 AND to_unit = $2")
            .bind(conversion.to.as_str())
            .bind(conversion.from.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_inverse_conversion", e))?;

        sqlx::query(
            r#"
            INSERT INTO unit_conversions (from_unit, to_unit, factor)
            VALUES ($1, $2, $3)
            ON CONFLICT (from_unit, to_unit)
            DO UPDATE SET factor = EXCLUDED.factor
            "#,
        )
        .bind(conversion.from.as_str())
        .bind(conversion.to.as_str())
        .bind(conversion.factor)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_conversion", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn list_conversions(&self) -> StoreResult<Vec<UnitConversion>> {
        let rows = sqlx::query(
            "SELECT from_unit, to_unit, factor FROM unit_conversions ORDER BY from_unit, to_unit",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_conversions", e))?;

        rows.iter()
            .map(|row| {
                let from: String = row.try_get("from_unit").map_err(corrupt)?;
                let to: String = row.try_get("to_unit").map_err(corrupt)?;
                let factor: Decimal = row.try_get("factor").map_err(corrupt)?;
                let conversion =
                    UnitConversion::new(UnitCode::new(from)?, UnitCode::new(to)?, factor)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(conversion)
            })
            .collect()
    }

    #[instrument(skip(self, doc), fields(document_no = %doc.header.document_no))]
    async fn insert_goods_receipt(&self, doc: GoodsReceipt) -> StoreResult<()> {
        self.insert_stock_document(GoodsReceipt::SOURCE, &doc.header, None, &doc.lines)
            .await
    }

    #[instrument(skip(self, doc), fields(document_no = %doc.header.document_no))]
    async fn insert_purchase_return(&self, doc: PurchaseReturn) -> StoreResult<()> {
        self.insert_stock_document(
            PurchaseReturn::SOURCE,
            &doc.header,
            doc.goods_receipt_id,
            &doc.lines,
        )
        .await
    }

    #[instrument(skip(self, doc), fields(document_no = %doc.header.document_no))]
    async fn insert_delivery_order(&self, doc: DeliveryOrder) -> StoreResult<()> {
        self.insert_stock_document(DeliveryOrder::SOURCE, &doc.header, None, &doc.lines)
            .await
    }

    #[instrument(skip(self, doc), fields(document_no = %doc.header.document_no))]
    async fn insert_sales_return(&self, doc: SalesReturn) -> StoreResult<()> {
        self.insert_stock_document(
            SalesReturn::SOURCE,
            &doc.header,
            doc.delivery_order_id,
            &doc.lines,
        )
        .await
    }

    #[instrument(skip(self, invoice), fields(invoice_no = %invoice.invoice_no))]
    async fn insert_purchase_invoice(&self, invoice: PurchaseInvoice) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let receipts: Vec<Uuid> = invoice
            .goods_receipt_ids
            .iter()
            .map(|id| *id.as_uuid())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO purchase_invoices
                (id, invoice_no, invoice_date, supplier, segment, goods_receipt_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.invoice_no)
        .bind(invoice.date)
        .bind(&invoice.supplier)
        .bind(invoice.segment.as_str())
        .bind(&receipts)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_invoice", e))?;

        for (idx, line) in invoice.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO purchase_invoice_lines (invoice_id, line_no, item_id, quantity, rate)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(invoice.id.as_uuid())
            .bind(idx as i32 + 1)
            .bind(line.item_id.as_uuid())
            .bind(line.quantity)
            .bind(line.rate)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_purchase_invoice_line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn goods_receipts(&self, filter: &DocumentFilter) -> StoreResult<Vec<GoodsReceipt>> {
        let records = self.load_stock_documents(GoodsReceipt::SOURCE, filter).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn purchase_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<PurchaseReturn>> {
        let records = self.load_stock_documents(PurchaseReturn::SOURCE, filter).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn delivery_orders(&self, filter: &DocumentFilter) -> StoreResult<Vec<DeliveryOrder>> {
        let records = self.load_stock_documents(DeliveryOrder::SOURCE, filter).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn sales_returns(&self, filter: &DocumentFilter) -> StoreResult<Vec<SalesReturn>> {
        let records = self.load_stock_documents(SalesReturn::SOURCE, filter).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn goods_receipts_by_ids(&self, ids: &[DocumentId]) -> StoreResult<Vec<GoodsReceipt>> {
        let records = self
            .load_stock_documents_where(GoodsReceipt::SOURCE, DocumentKey::Id, ids)
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn delivery_order_segment(&self, id: DocumentId) -> StoreResult<Option<Segment>> {
        let row = sqlx::query("SELECT segment FROM stock_documents WHERE kind = $1 AND id = $2")
            .bind(DeliveryOrder::SOURCE.as_str())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delivery_order_segment", e))?;
        row.map(|row| {
            let segment: String = row.try_get("segment").map_err(corrupt)?;
            Segment::new(segment).map_err(|e| StoreError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    async fn purchase_returns_against(
        &self,
        goods_receipt_ids: &[DocumentId],
    ) -> StoreResult<Vec<PurchaseReturn>> {
        let records = self
            .load_stock_documents_where(
                PurchaseReturn::SOURCE,
                DocumentKey::Reference,
                goods_receipt_ids,
            )
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn get_purchase_invoice(&self, id: DocumentId) -> StoreResult<Option<PurchaseInvoice>> {
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_no, invoice_date, supplier, segment, goods_receipt_ids
            FROM purchase_invoices
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_purchase_invoice", e))?;

        Ok(self.invoices_from_rows(rows).await?.into_iter().next())
    }

    async fn purchase_invoices(&self, segment: &Segment) -> StoreResult<Vec<PurchaseInvoice>> {
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_no, invoice_date, supplier, segment, goods_receipt_ids
            FROM purchase_invoices
            WHERE segment = $1
            ORDER BY seq
            "#,
        )
        .bind(segment.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchase_invoices", e))?;

        self.invoices_from_rows(rows).await
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => {
                return StoreError::Domain(DomainError::conflict(format!(
                    "duplicate record in {operation}"
                )));
            }
            Some("23503") => {
                return StoreError::Domain(DomainError::validation(format!(
                    "referenced record does not exist in {operation}"
                )));
            }
            _ => {}
        }
    }
    tracing::error!(operation, error = %err, "database operation failed");
    StoreError::Database {
        operation,
        message: err.to_string(),
    }
}

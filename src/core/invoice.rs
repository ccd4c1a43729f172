//! 電子稅務發票 (세금계산서) 欄位擷取
//!
//! 以標籤為基準的正規表示式比對。必要欄位依序為：
//! 供應者登錄號碼、供應者商號、買受者登錄號碼、買受者商號。
//! 缺少任何一項即視為失敗，但已擷取的欄位仍會保留在報告中。

use crate::domain::model::{InvoiceReport, LineItem, TaxInvoice};
use crate::utils::error::{AutomationError, Result};
use regex::Regex;

pub struct InvoiceExtractor {
    supplier_reg: Regex,
    supplier_name: Regex,
    buyer_reg: Regex,
    buyer_name: Regex,
    address: Regex,
    ceo: Regex,
    business_type: Regex,
    item_type: Regex,
    item: Regex,
    approval: Regex,
    issue_date: Regex,
    total: Regex,
    supply: Regex,
    tax: Regex,
    phone: Regex,
    email: Regex,
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_amount(raw: &str) -> Option<u64> {
    raw.replace(',', "").parse().ok()
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| AutomationError::FieldNotFound {
        field: field.to_string(),
    })
}

impl InvoiceExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            supplier_reg: Regex::new(r"공\s*급\s*자[\s\S]*?등록번호\s*(\d{3}-\d{2}-\d{5})")?,
            supplier_name: Regex::new(r"공\s*급\s*자[\s\S]*?상호[\s\S]*?([^\n]+)")?,
            buyer_reg: Regex::new(r"공\s*급\s*받\s*는\s*자[\s\S]*?등록번호\s*(\d{3}-\d{2}-\d{5})")?,
            buyer_name: Regex::new(r"공\s*급\s*받\s*는\s*자[\s\S]*?상호[\s\S]*?([^\n]+)")?,
            address: Regex::new(r"사업장\s*주소\s*([^\n]+)")?,
            ceo: Regex::new(r"성명\s*([^\n]+)")?,
            business_type: Regex::new(r"업태\s*([^\n]+)")?,
            item_type: Regex::new(r"종목\s*([^\n]+)")?,
            item: Regex::new(
                r"(\d{2})\s(\d{2})\s([\w\-/]+)(?:\s([^\n]+))?\s(\d+)\s([0-9,]+)\s([0-9,]+)\s([0-9,]+)",
            )?,
            approval: Regex::new(r"승인\s*번호\s*[:：]?\s*([0-9A-Za-z][0-9A-Za-z\-]*)")?,
            issue_date: Regex::new(
                r"(?:작성|발행)\s*일자\s*[:：]?\s*(\d{4})\s*[-./년]\s*(\d{1,2})\s*[-./월]\s*(\d{1,2})",
            )?,
            total: Regex::new(r"합계\s*금액[ \t]*[:：]?[ \t]*(\d[\d,]*)")?,
            supply: Regex::new(r"공급\s*가액[ \t]*[:：]?[ \t]*(\d[\d,]*)")?,
            tax: Regex::new(r"(?:^|[^가-힣])세액[ \t]*[:：]?[ \t]*(\d[\d,]*)")?,
            phone: Regex::new(r"\b0\d{1,2}-\d{3,4}-\d{4}\b")?,
            email: Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")?,
        })
    }

    /// 擷取所有欄位；必要欄位缺少時回傳錯誤
    pub fn extract(&self, text: &str) -> Result<TaxInvoice> {
        let mut invoice = TaxInvoice::default();
        self.extract_into(text, &mut invoice)?;
        Ok(invoice)
    }

    /// 擷取並包成報告，失敗時保留部分結果
    pub fn extract_report(&self, text: &str) -> InvoiceReport {
        let mut invoice = TaxInvoice::default();
        match self.extract_into(text, &mut invoice) {
            Ok(()) => {
                tracing::info!(
                    "✅ Invoice extracted: {} items",
                    invoice.items.len()
                );
                InvoiceReport::success(invoice)
            }
            Err(e) => {
                tracing::warn!("❌ Invoice extraction failed: {}", e);
                InvoiceReport::failure(invoice, e.to_string())
            }
        }
    }

    fn extract_into(&self, text: &str, invoice: &mut TaxInvoice) -> Result<()> {
        invoice.supplier.registration_number = Some(required(
            first_capture(&self.supplier_reg, text),
            "supplier registration number",
        )?);
        invoice.supplier.company_name = Some(required(
            first_capture(&self.supplier_name, text),
            "supplier company name",
        )?);
        invoice.buyer.registration_number = Some(required(
            first_capture(&self.buyer_reg, text),
            "buyer registration number",
        )?);
        invoice.buyer.company_name = Some(required(
            first_capture(&self.buyer_name, text),
            "buyer company name",
        )?);

        invoice.supplier.address = first_capture(&self.address, text);
        invoice.supplier.ceo_name = first_capture(&self.ceo, text);
        invoice.supplier.business_type = first_capture(&self.business_type, text);
        invoice.supplier.item_type = first_capture(&self.item_type, text);
        invoice.buyer.address = self
            .address
            .captures_iter(text)
            .nth(1)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());

        invoice.items = self.extract_items(text);

        invoice.document_info.approval_number = first_capture(&self.approval, text);
        invoice.document_info.issue_date = self.issue_date.captures(text).and_then(|c| {
            let month: u32 = c[2].parse().ok()?;
            let day: u32 = c[3].parse().ok()?;
            Some(format!("{}-{:02}-{:02}", &c[1], month, day))
        });

        self.extract_amounts(text, invoice);
        self.extract_contacts(text, invoice);
        Ok(())
    }

    fn extract_items(&self, text: &str) -> Vec<LineItem> {
        self.item
            .captures_iter(text)
            .filter_map(|c| {
                Some(LineItem {
                    month: c[1].to_string(),
                    day: c[2].to_string(),
                    item_name: c[3].trim().to_string(),
                    specification: c.get(4).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
                    quantity: c[5].parse().ok()?,
                    unit_price: parse_amount(&c[6])?,
                    supply_amount: parse_amount(&c[7])?,
                    tax_amount: parse_amount(&c[8])?,
                })
            })
            .collect()
    }

    fn extract_amounts(&self, text: &str, invoice: &mut TaxInvoice) {
        let amount = |pattern: &Regex| first_capture(pattern, text).and_then(|s| parse_amount(&s));
        let items = &invoice.items;

        let supply = amount(&self.supply).or_else(|| {
            (!items.is_empty()).then(|| items.iter().map(|i| i.supply_amount).sum())
        });
        let tax = amount(&self.tax)
            .or_else(|| (!items.is_empty()).then(|| items.iter().map(|i| i.tax_amount).sum()));
        let total = amount(&self.total).or_else(|| match (supply, tax) {
            (Some(s), Some(t)) => Some(s + t),
            _ => None,
        });

        invoice.amounts.supply_amount = supply;
        invoice.amounts.tax_amount = tax;
        invoice.amounts.total_amount = total;
    }

    fn extract_contacts(&self, text: &str, invoice: &mut TaxInvoice) {
        for m in self.phone.find_iter(text) {
            let phone = m.as_str().to_string();
            if !invoice.contacts.phones.contains(&phone) {
                invoice.contacts.phones.push(phone);
            }
        }
        for m in self.email.find_iter(text) {
            let email = m.as_str().to_string();
            if !invoice.contacts.emails.contains(&email) {
                invoice.contacts.emails.push(email);
            }
        }
    }
}

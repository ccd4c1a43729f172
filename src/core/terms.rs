//! 由發票資料產生範本佔位符的置換詞彙

use crate::domain::model::{ReferenceTable, TaxInvoice};
use chrono::Local;

/// 範本常用的固定佔位符，參照資料或設定中的同名詞彙會覆寫
pub const DEFAULT_PLACEHOLDERS: [(&str, &str); 3] = [
    ("[작성자]", "담당자"),
    ("[부서]", "영업부"),
    ("[제목]", "세금계산서 관련 문서"),
];

/// 以千分位格式化金額，例如 `1,234,000원`
pub fn format_won(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('원');
    out
}

pub fn generate_terms(invoice: &TaxInvoice) -> ReferenceTable {
    let mut terms = ReferenceTable::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            terms.insert(key, value);
        }
    };

    put("[공급자명]", invoice.supplier.company_name.clone());
    put("[공급자등록번호]", invoice.supplier.registration_number.clone());
    put("[공급받는자명]", invoice.buyer.company_name.clone());
    put("[공급받는자등록번호]", invoice.buyer.registration_number.clone());
    put("[승인번호]", invoice.document_info.approval_number.clone());
    put("[발행일자]", invoice.document_info.issue_date.clone());

    // 金額與數量為 0 視同未擷取
    let won = |amount: Option<u64>| amount.filter(|&a| a > 0).map(format_won);
    put("[총금액]", won(invoice.amounts.total_amount));
    put("[공급가액]", won(invoice.amounts.supply_amount));
    put("[세액]", won(invoice.amounts.tax_amount));

    if let Some(item) = invoice.items.first() {
        put("[주요품목]", Some(item.item_name.clone()));
        put("[수량]", Some(item.quantity).filter(|&q| q > 0).map(|q| q.to_string()));
    }

    put("[연락처]", invoice.contacts.phones.first().cloned());
    put("[이메일]", invoice.contacts.emails.first().cloned());

    put("[오늘날짜]", Some(Local::now().format("%Y-%m-%d").to_string()));
    for (key, value) in DEFAULT_PLACEHOLDERS {
        put(key, Some(value.to_string()));
    }

    tracing::info!("📊 Generated {} placeholder terms", terms.len());
    terms
}

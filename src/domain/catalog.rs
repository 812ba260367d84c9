//! Built-in metric catalogue.
//!
//! Raw keys are prefixed by statement: `is.` income statement, `bs.` balance
//! sheet, `cf.` cash flow, `ops.` operating data, `mkt.` market data. Growth
//! metrics read the prior period under `prior.` (`prior.is.NetRevenue`).

use crate::domain::metric::{Category, MetricSpec, Unit};

use Category::*;

fn direct(id: &str, category: Category, unit: Unit, field: &str, description: &str) -> MetricSpec {
    MetricSpec::direct(id, category, unit, field, description)
}

fn derived(id: &str, category: Category, unit: Unit, formula: &str, description: &str) -> MetricSpec {
    MetricSpec::derived(id, category, unit, formula, description)
}

pub fn standard_metrics() -> Vec<MetricSpec> {
    let mut specs = Vec::with_capacity(90);
    specs.extend(income_statement());
    specs.extend(per_share());
    specs.extend(balance_sheet());
    specs.extend(cash_flow());
    specs.extend(ratios_and_margins());
    specs.extend(growth());
    specs.extend(returns());
    specs.extend(liquidity());
    specs.extend(valuation());
    specs
}

fn income_statement() -> Vec<MetricSpec> {
    use Unit::Currency;
    vec![
        direct("revenue", IncomeStatement, Currency, "is.NetRevenue", "Total top-line sales")
            .aliases(&["sales", "top_line"]),
        direct("cogs", IncomeStatement, Currency, "is.CostOfRevenue", "Cost of goods / services")
            .aliases(&["cost_of_revenue", "cost_of_goods_sold"]),
        direct("gross_profit", IncomeStatement, Currency, "is.GrossProfit", "Revenue minus COGS")
            .fallback("revenue - cogs")
            .aliases(&["gross_income"]),
        direct("rnd", IncomeStatement, Currency, "is.RD", "Research & development exp.")
            .aliases(&["r&d", "research_and_development"]),
        direct("sga", IncomeStatement, Currency, "is.SG&A", "Selling, general & admin")
            .aliases(&["sg&a"]),
        direct("operating_income", IncomeStatement, Currency, "is.OperatingIncome", "EBIT; income from operations")
            .fallback("gross_profit - rnd - sga")
            .aliases(&["operating_profit"]),
        derived("ebit", IncomeStatement, Currency, "operating_income", "Synonym for operating income"),
        direct("interest_expense", IncomeStatement, Currency, "is.InterestExpense", "Net interest cost"),
        direct("ebt", IncomeStatement, Currency, "is.IncomeBeforeTax", "Earnings before tax")
            .aliases(&["pretax_income"]),
        direct("tax_expense", IncomeStatement, Currency, "is.IncomeTax", "Provision for income taxes")
            .aliases(&["income_tax"]),
        direct("net_income", IncomeStatement, Currency, "is.NetIncome", "Bottom-line profit")
            .aliases(&["profits", "earnings", "bottom_line"]),
        derived("ebitda", IncomeStatement, Currency, "operating_income + is.D&A", "EBIT + depreciation & amort."),
        direct("preferred_dividends", IncomeStatement, Currency, "is.PreferredDividends", "Preferred payouts"),
        direct("employees", IncomeStatement, Unit::Count, "ops.Employees", "Full-time headcount"),
        derived(
            "nopat",
            IncomeStatement,
            Currency,
            "operating_income * (1 - effective_tax_rate_pct)",
            "Net operating profit after tax",
        ),
    ]
}

fn per_share() -> Vec<MetricSpec> {
    use Unit::Currency;
    vec![
        direct("eps_basic", PerShare, Currency, "is.EPSBasic", "Earnings per share, basic"),
        direct("eps_diluted", PerShare, Currency, "is.EPSDiluted", "Earnings per share, diluted")
            .aliases(&["eps"]),
        direct("shares_out", PerShare, Unit::Count, "is.WeightedAvgSharesDiluted", "Diluted share count"),
        direct("dividend_per_share", PerShare, Currency, "mkt.DividendPerShare", "Dividends declared per share")
            .aliases(&["dps"]),
        derived(
            "book_value_per_share",
            PerShare,
            Currency,
            "shareholders_equity / shares_out",
            "Book equity per diluted share",
        ),
        derived(
            "tangible_book_value_per_share",
            PerShare,
            Currency,
            "tangible_book_value / shares_out",
            "Tangible book value per diluted share",
        ),
    ]
}

fn balance_sheet() -> Vec<MetricSpec> {
    use Unit::Currency;
    vec![
        direct("cash", BalanceSheet, Currency, "bs.CashAndEquivalents", "Cash & cash equivalents"),
        direct("short_term_investments", BalanceSheet, Currency, "bs.ShortTermInvestments", "Marketable securities"),
        direct("accounts_receivable", BalanceSheet, Currency, "bs.AccountsReceivable", "Trade receivables")
            .aliases(&["ar"]),
        direct("inventory", BalanceSheet, Currency, "bs.Inventory", "Inventories"),
        direct("current_assets", BalanceSheet, Currency, "bs.TotalCurrentAssets", "Total current assets"),
        direct("pp&e", BalanceSheet, Currency, "bs.PP&E", "Property, plant & equipment")
            .aliases(&["ppe", "property_plant_equipment"]),
        direct("goodwill", BalanceSheet, Currency, "bs.Goodwill", "Goodwill intangible"),
        direct("total_assets", BalanceSheet, Currency, "bs.TotalAssets", "Sum of assets")
            .aliases(&["assets"]),
        direct("accounts_payable", BalanceSheet, Currency, "bs.AccountsPayable", "Trade accounts payable")
            .aliases(&["ap"]),
        direct("deferred_revenue", BalanceSheet, Currency, "bs.DeferredRevenue", "Contract liabilities"),
        direct("current_liabilities", BalanceSheet, Currency, "bs.TotalCurrentLiabilities", "Due within 12 mo."),
        direct("long_term_debt", BalanceSheet, Currency, "bs.LongTermDebt", "Borrowings >1 year")
            .aliases(&["debt"]),
        direct("short_term_debt", BalanceSheet, Currency, "bs.ShortTermDebt", "Borrowings due within a year"),
        direct("total_liabilities", BalanceSheet, Currency, "bs.TotalLiabilities", "All liabilities")
            .aliases(&["liabilities"]),
        direct("shareholders_equity", BalanceSheet, Currency, "bs.TotalEquity", "Book value of equity")
            .aliases(&["equity", "book_value"]),
        derived("tangible_book_value", BalanceSheet, Currency, "shareholders_equity - goodwill", "Equity less intangibles"),
        derived("working_capital", BalanceSheet, Currency, "current_assets - current_liabilities", "Operational liquidity"),
        derived("interest_bearing_debt", BalanceSheet, Currency, "long_term_debt + short_term_debt", "All debt obligations"),
        derived(
            "invested_capital",
            BalanceSheet,
            Currency,
            "shareholders_equity + interest_bearing_debt - cash",
            "Equity plus debt, net of cash",
        ),
    ]
}

fn cash_flow() -> Vec<MetricSpec> {
    use Unit::Currency;
    vec![
        direct("cfo", CashFlow, Currency, "cf.CashFromOperations", "Net cash from ops")
            .aliases(&["operating_cash_flow"]),
        // Reported as filed; usually negative.
        direct("capex", CashFlow, Currency, "cf.CapEx", "Capital expenditures")
            .aliases(&["capital_expenditures"]),
        derived("free_cash_flow", CashFlow, Currency, "cfo - abs(capex)", "CFO minus capex")
            .aliases(&["fcf"]),
        direct("cff", CashFlow, Currency, "cf.CashFromFinancing", "Cash from financing"),
        direct("cfi", CashFlow, Currency, "cf.CashFromInvesting", "Cash from investing"),
    ]
}

fn ratios_and_margins() -> Vec<MetricSpec> {
    use Unit::{Days, Percent};
    vec![
        derived("gross_margin_pct", RatioMargin, Percent, "gross_profit / revenue", "Gross profit / revenue")
            .aliases(&["gross_margin"]),
        derived("operating_margin_pct", RatioMargin, Percent, "operating_income / revenue", "EBIT margin")
            .aliases(&["ebit_margin", "operating_margin"]),
        derived("net_margin_pct", RatioMargin, Percent, "net_income / revenue", "Net profit margin")
            .aliases(&["profit_margin", "net_profit_margin", "net_margin"]),
        derived("rd_pct", RatioMargin, Percent, "rnd / revenue", "R&D as % of sales"),
        derived("sga_pct", RatioMargin, Percent, "sga / revenue", "SG&A as % of sales"),
        derived("fcf_margin_pct", RatioMargin, Percent, "free_cash_flow / revenue", "FCF margin"),
        derived("ebitda_margin_pct", RatioMargin, Percent, "ebitda / revenue", "EBITDA margin"),
        derived("capex_sales_pct", RatioMargin, Percent, "abs(capex) / revenue", "Capex intensity"),
        derived("ocf_conversion_pct", RatioMargin, Percent, "cfo / net_income", "Cash conversion (ops)"),
        derived(
            "dividend_payout_pct",
            RatioMargin,
            Percent,
            "dividend_per_share / eps_diluted",
            "Payout ratio",
        ),
        derived("effective_tax_rate_pct", RatioMargin, Percent, "tax_expense / ebt", "Tax expense / pre-tax income"),
        derived("revenue_per_employee", RatioMargin, Unit::Currency, "revenue / employees", "Efficiency metric"),
        derived(
            "days_sales_outstanding",
            RatioMargin,
            Days,
            "accounts_receivable / revenue * 365",
            "Receivables / sales days",
        ),
        derived("days_inventory", RatioMargin, Days, "inventory / cogs * 365", "Inventory days"),
        derived("days_payables", RatioMargin, Days, "accounts_payable / cogs * 365", "Payables days"),
        derived(
            "cash_conversion_cycle",
            RatioMargin,
            Days,
            "days_inventory + days_sales_outstanding - days_payables",
            "Supply-chain cash cycle",
        ),
    ]
}

fn growth() -> Vec<MetricSpec> {
    use Unit::Percent;
    vec![
        derived("revenue_growth_pct", Growth, Percent, "revenue / prior.is.NetRevenue - 1", "YoY top-line growth"),
        derived("eps_growth_pct", Growth, Percent, "eps_diluted / prior.is.EPSDiluted - 1", "YoY EPS growth"),
        derived("rd_growth_pct", Growth, Percent, "rnd / prior.is.RD - 1", "YoY R&D growth"),
        derived("capex_growth_pct", Growth, Percent, "abs(capex) / abs(prior.cf.CapEx) - 1", "YoY CapEx growth"),
    ]
}

fn returns() -> Vec<MetricSpec> {
    use Unit::Percent;
    vec![
        derived("roe_pct", Return, Percent, "net_income / shareholders_equity", "Return on equity"),
        derived("roa_pct", Return, Percent, "net_income / total_assets", "Return on assets"),
        derived("roic_pct", Return, Percent, "nopat / invested_capital", "Return on invested capital"),
        derived("total_return_1y_pct", Return, Percent, "price / prior.mkt.Price - 1", "1-year price return"),
    ]
}

fn liquidity() -> Vec<MetricSpec> {
    use Unit::Ratio;
    vec![
        derived("current_ratio", Liquidity, Ratio, "current_assets / current_liabilities", "Liquidity ratio"),
        derived(
            "quick_ratio",
            Liquidity,
            Ratio,
            "(cash + short_term_investments + accounts_receivable) / current_liabilities",
            "Acid-test ratio",
        ),
        derived("debt_equity", Liquidity, Ratio, "long_term_debt / shareholders_equity", "Leverage ratio"),
        derived("debt_ebitda", Liquidity, Ratio, "long_term_debt / ebitda", "Debt / EBITDA"),
        derived("interest_coverage", Liquidity, Ratio, "ebit / abs(interest_expense)", "EBIT / Interest"),
    ]
}

fn valuation() -> Vec<MetricSpec> {
    use Unit::{Currency, Percent, Ratio};
    vec![
        direct("price", Valuation, Currency, "mkt.Price", "Share price at period end")
            .aliases(&["share_price"]),
        derived("market_cap", Valuation, Currency, "price * shares_out", "Price × diluted shares")
            .aliases(&["mcap"]),
        derived(
            "enterprise_value",
            Valuation,
            Currency,
            "market_cap + total_liabilities - cash",
            "EV = Mcap + debt - cash",
        )
        .aliases(&["ev"]),
        derived("ev_ebitda", Valuation, Ratio, "enterprise_value / ebitda", "EV / EBITDA multiple"),
        derived("ev_sales", Valuation, Ratio, "enterprise_value / revenue", "EV / Sales"),
        derived("ev_ebit", Valuation, Ratio, "enterprise_value / ebit", "EV / EBIT"),
        derived("price_sales", Valuation, Ratio, "market_cap / revenue", "P/S ratio")
            .aliases(&["ps", "ps_ratio"]),
        derived("price_earnings", Valuation, Ratio, "price / eps_diluted", "Trailing P/E")
            .aliases(&["pe", "pe_ratio"]),
        derived("price_book", Valuation, Ratio, "price / tangible_book_value_per_share", "P/B on tangible BV")
            .aliases(&["pb"]),
        derived("dividend_yield_pct", Valuation, Percent, "dividend_per_share / price", "Dividends / price"),
        derived("fcf_yield_pct", Valuation, Percent, "free_cash_flow / market_cap", "FCF / market cap"),
    ]
}

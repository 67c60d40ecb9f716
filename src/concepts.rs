//! Static registry of the US-GAAP and DEI concepts the extractor knows about.
//!
//! Each canonical field lists every local tag name that has been observed to
//! carry that concept across taxonomy years. Identity is the local name only;
//! the namespace merely selects the vocabulary, because filers bind the same
//! taxonomy under different prefixes and versioned URIs.

use ahash::AHashMap;
use std::sync::OnceLock;

use crate::model::{PeriodConstraint, ValueKind, Vocabulary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptDefinition {
    pub field: &'static str,
    pub vocabulary: Vocabulary,
    pub aliases: &'static [&'static str],
    pub kind: ValueKind,
    pub period: PeriodConstraint,
}

macro_rules! concepts {
    ($vocab:ident; $( $field:ident : $kind:ident, $period:ident => [$($alias:literal),+ $(,)?] );+ $(;)?) => {
        &[
            $(ConceptDefinition {
                field: stringify!($field),
                vocabulary: Vocabulary::$vocab,
                aliases: &[$($alias),+],
                kind: ValueKind::$kind,
                period: PeriodConstraint::$period,
            }),+
        ]
    };
}

/// GAAP fields in canonical order.
pub static GAAP_CONCEPTS: &[ConceptDefinition] = concepts! { Gaap;
    // Balance sheet
    assets: Monetary, Instant => ["Assets"];
    current_assets: Monetary, Instant => ["AssetsCurrent"];
    non_current_assets: Monetary, Instant => ["AssetsNoncurrent", "NoncurrentAssets"];
    cash_and_cash_equivalents: Monetary, Instant => [
        "CashAndCashEquivalentsAtCarryingValue",
        "CashAndDueFromBanks",
        "Cash",
    ];
    inventory_net: Monetary, Instant => ["InventoryNet"];
    liabilities_and_equity: Monetary, Instant => [
        "LiabilitiesAndStockholdersEquity",
        "LiabilitiesAndPartnersCapital",
    ];
    liabilities: Monetary, Instant => ["Liabilities"];
    current_liabilities: Monetary, Instant => ["LiabilitiesCurrent"];
    noncurrent_liabilities: Monetary, Instant => ["LiabilitiesNoncurrent"];
    long_term_debt: Monetary, Instant => ["LongTermDebtNoncurrent", "LongTermDebt"];
    commitments_and_contingencies: Monetary, Instant => ["CommitmentsAndContingencies"];
    redeemable_noncontrolling_interest: Monetary, Instant => [
        "RedeemableNoncontrollingInterestEquityCarryingAmount",
        "RedeemableNoncontrollingInterestEquityCommonCarryingAmount",
    ];
    temporary_equity: Monetary, Instant => [
        "TemporaryEquityCarryingAmount",
        "TemporaryEquityCarryingAmountAttributableToParent",
    ];
    equity: Monetary, Instant => [
        "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        "PartnersCapitalIncludingPortionAttributableToNoncontrollingInterest",
    ];
    equity_attributable_interest: Monetary, Instant => [
        "MinorityInterest",
        "PartnersCapitalAttributableToNoncontrollingInterest",
    ];
    stockholders_equity: Monetary, Instant => ["StockholdersEquity", "PartnersCapital", "MembersEquity"];
    common_shares_outstanding: Shares, Instant => ["CommonStockSharesOutstanding"];
    common_shares_issued: Shares, Instant => ["CommonStockSharesIssued"];
    common_shares_authorized: Shares, Instant => ["CommonStockSharesAuthorized"];

    // Income statement
    revenues: Monetary, Duration => [
        "Revenues",
        "SalesRevenueNet",
        "SalesRevenueGoodsNet",
        "SalesRevenueServicesNet",
        "RevenueFromContractWithCustomerExcludingAssessedTax",
        "RevenueFromContractWithCustomerIncludingAssessedTax",
        "RevenuesNetOfInterestExpense",
        "RevenuesExcludingInterestAndDividends",
        "TotalRevenuesAndOtherIncome",
        "HealthCareOrganizationRevenue",
        "OilAndGasRevenue",
        "RevenueMineralSales",
        "ElectricalTransmissionAndDistributionRevenue",
    ];
    cost_of_revenue: Monetary, Duration => [
        "CostOfRevenue",
        "CostOfGoodsSold",
        "CostOfServices",
        "CostOfGoodsAndServicesSold",
    ];
    gross_profit: Monetary, Duration => ["GrossProfit"];
    research_and_development: Monetary, Duration => ["ResearchAndDevelopmentExpense"];
    selling_general_and_administrative: Monetary, Duration => ["SellingGeneralAndAdministrativeExpense"];
    operating_expenses: Monetary, Duration => ["OperatingExpenses"];
    costs_and_expenses: Monetary, Duration => ["CostsAndExpenses"];
    other_operating_income: Monetary, Duration => ["OtherOperatingIncome"];
    operating_income_loss: Monetary, Duration => ["OperatingIncomeLoss"];
    nonoperating_income_loss: Monetary, Duration => ["NonoperatingIncomeExpense"];
    interest_and_debt_expense: Monetary, Duration => ["InterestAndDebtExpense", "InterestExpense"];
    income_before_equity_investments: Monetary, Duration => [
        "IncomeLossFromContinuingOperationsBeforeIncomeTaxesMinorityInterestAndIncomeLossFromEquityMethodInvestments",
        "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
    ];
    income_from_equity_investments: Monetary, Duration => ["IncomeLossFromEquityMethodInvestments"];
    income_tax: Monetary, Duration => [
        "IncomeTaxExpenseBenefit",
        "IncomeTaxExpenseBenefitContinuingOperations",
    ];
    income_from_continuing_operations_after_tax: Monetary, Duration => [
        "IncomeLossFromContinuingOperations",
        "IncomeLossBeforeExtraordinaryItemsAndCumulativeEffectOfChangeInAccountingPrinciple",
    ];
    income_from_discontinued_operations: Monetary, Duration => [
        "IncomeLossFromDiscontinuedOperationsNetOfTax",
        "DiscontinuedOperationIncomeLossFromDiscontinuedOperationNetOfTax",
    ];
    extraordinary_items_gain_loss: Monetary, Duration => ["ExtraordinaryItemNetOfTax"];
    net_income_loss: Monetary, Duration => ["NetIncomeLoss", "ProfitLoss", "NetIncomeLossAttributableToParent"];
    net_income_available_to_common_stockholders_basic: Monetary, Duration => [
        "NetIncomeLossAvailableToCommonStockholdersBasic",
    ];
    preferred_stock_dividends: Monetary, Duration => ["PreferredStockDividendsAndOtherAdjustments"];
    net_income_attributable_to_noncontrolling_interest: Monetary, Duration => [
        "NetIncomeLossAttributableToNoncontrollingInterest",
    ];
    earnings_per_share_basic: PerShare, Duration => ["EarningsPerShareBasic", "EarningsPerShareBasicAndDiluted"];
    earnings_per_share_diluted: PerShare, Duration => ["EarningsPerShareDiluted"];
    weighted_average_shares_basic: Shares, Duration => ["WeightedAverageNumberOfSharesOutstandingBasic"];
    weighted_average_shares_diluted: Shares, Duration => ["WeightedAverageNumberOfDilutedSharesOutstanding"];
    other_comprehensive_income: Monetary, Duration => ["OtherComprehensiveIncomeLossNetOfTax"];
    comprehensive_income: Monetary, Duration => [
        "ComprehensiveIncomeNetOfTaxIncludingPortionAttributableToNoncontrollingInterest",
    ];
    comprehensive_income_parent: Monetary, Duration => ["ComprehensiveIncomeNetOfTax"];
    comprehensive_income_interest: Monetary, Duration => [
        "ComprehensiveIncomeNetOfTaxAttributableToNoncontrollingInterest",
    ];

    // Cash flow statement
    net_cash_flows_operating: Monetary, Duration => ["NetCashProvidedByUsedInOperatingActivities"];
    net_cash_flows_investing: Monetary, Duration => ["NetCashProvidedByUsedInInvestingActivities"];
    net_cash_flows_financing: Monetary, Duration => ["NetCashProvidedByUsedInFinancingActivities"];
    net_cash_flows_operating_continuing: Monetary, Duration => [
        "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
    ];
    net_cash_flows_investing_continuing: Monetary, Duration => [
        "NetCashProvidedByUsedInInvestingActivitiesContinuingOperations",
    ];
    net_cash_flows_financing_continuing: Monetary, Duration => [
        "NetCashProvidedByUsedInFinancingActivitiesContinuingOperations",
    ];
    net_cash_flows_operating_discontinued: Monetary, Duration => [
        "CashProvidedByUsedInOperatingActivitiesDiscontinuedOperations",
    ];
    net_cash_flows_investing_discontinued: Monetary, Duration => [
        "CashProvidedByUsedInInvestingActivitiesDiscontinuedOperations",
    ];
    net_cash_flows_discontinued: Monetary, Duration => ["NetCashProvidedByUsedInDiscontinuedOperations"];
    payments_for_property_plant_and_equipment: Monetary, Duration => [
        "PaymentsToAcquirePropertyPlantAndEquipment",
    ];
    dividends_paid: Monetary, Duration => ["PaymentsOfDividends", "PaymentsOfDividendsCommonStock"];
    exchange_gains_losses: Monetary, Duration => [
        "EffectOfExchangeRateOnCashAndCashEquivalents",
        "EffectOfExchangeRateOnCashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
    ];
    cash_period_increase_decrease: Monetary, Duration => [
        "CashAndCashEquivalentsPeriodIncreaseDecrease",
        "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
    ];
};

/// DEI fields in canonical order.
pub static DEI_CONCEPTS: &[ConceptDefinition] = concepts! { Dei;
    entity_registrant_name: String, Either => ["EntityRegistrantName"];
    entity_central_index_key: String, Either => ["EntityCentralIndexKey"];
    trading_symbol: String, Either => ["TradingSymbol"];
    document_type: String, Either => ["DocumentType"];
    document_period_end_date: Date, Either => ["DocumentPeriodEndDate"];
    document_fiscal_year_focus: String, Either => ["DocumentFiscalYearFocus"];
    document_fiscal_period_focus: String, Either => ["DocumentFiscalPeriodFocus"];
    current_fiscal_year_end_date: String, Either => ["CurrentFiscalYearEndDate"];
    amendment_flag: Boolean, Either => ["AmendmentFlag"];
    entity_filer_category: String, Either => ["EntityFilerCategory"];
    entity_current_reporting_status: String, Either => ["EntityCurrentReportingStatus"];
    entity_well_known_seasoned_issuer: String, Either => ["EntityWellKnownSeasonedIssuer"];
    entity_voluntary_filers: String, Either => ["EntityVoluntaryFilers"];
    entity_common_stock_shares_outstanding: Shares, Either => ["EntityCommonStockSharesOutstanding"];
    entity_public_float: Monetary, Either => ["EntityPublicFloat"];
};

/// Alias index over the static concept tables. Immutable once built, so a
/// single instance is shared by every extraction call on every thread.
#[derive(Debug)]
pub struct ConceptDictionary {
    gaap: AHashMap<&'static str, usize>,
    dei: AHashMap<&'static str, usize>,
}

impl ConceptDictionary {
    pub fn new() -> Self {
        Self {
            gaap: index(GAAP_CONCEPTS),
            dei: index(DEI_CONCEPTS),
        }
    }

    /// The process-wide dictionary built from the static tables.
    pub fn standard() -> &'static ConceptDictionary {
        static STANDARD: OnceLock<ConceptDictionary> = OnceLock::new();
        STANDARD.get_or_init(ConceptDictionary::new)
    }

    pub fn concepts(&self, vocabulary: Vocabulary) -> &'static [ConceptDefinition] {
        match vocabulary {
            Vocabulary::Gaap => GAAP_CONCEPTS,
            Vocabulary::Dei => DEI_CONCEPTS,
        }
    }

    /// Position of the concept in its vocabulary's canonical order.
    pub fn lookup_index(&self, local_name: &str, vocabulary: Vocabulary) -> Option<usize> {
        let map = match vocabulary {
            Vocabulary::Gaap => &self.gaap,
            Vocabulary::Dei => &self.dei,
        };
        map.get(local_name).copied()
    }

    pub fn lookup(
        &self,
        local_name: &str,
        vocabulary: Vocabulary,
    ) -> Option<&'static ConceptDefinition> {
        self.lookup_index(local_name, vocabulary)
            .map(|i| &self.concepts(vocabulary)[i])
    }

    pub fn field_index(&self, field: &str, vocabulary: Vocabulary) -> Option<usize> {
        self.concepts(vocabulary).iter().position(|c| c.field == field)
    }
}

impl Default for ConceptDictionary {
    fn default() -> Self {
        Self::new()
    }
}

fn index(concepts: &'static [ConceptDefinition]) -> AHashMap<&'static str, usize> {
    let mut map = AHashMap::with_capacity(concepts.len() * 2);
    for (i, concept) in concepts.iter().enumerate() {
        for alias in concept.aliases {
            // First definition wins; the uniqueness test keeps this from mattering.
            map.entry(*alias).or_insert(i);
        }
    }
    map
}

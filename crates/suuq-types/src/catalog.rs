use serde::Serialize;

use crate::i18n::Language;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub so_name: &'static str,
    pub en_name: &'static str,
    pub icon: &'static str,
}

impl Category {
    pub fn name(&self, lang: Language) -> &'static str {
        match lang {
            Language::So => self.so_name,
            Language::En => self.en_name,
        }
    }

    /// Categories whose ads carry brand/model/year/condition.
    pub fn has_item_details(&self) -> bool {
        matches!(self.id, "vehicles" | "phones" | "electronics")
    }

    /// Job ads must link a CV.
    pub fn requires_cv(&self) -> bool {
        self.id == "jobs"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Somalia,
    Kenya,
    Djibouti,
}

impl Country {
    pub fn dial_code(&self) -> &'static str {
        match self {
            Self::Somalia => "+252",
            Self::Kenya => "+254",
            Self::Djibouti => "+253",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub country: Country,
}

pub const CATEGORIES: &[Category] = &[
    Category { id: "vehicles", so_name: "Baabuurta", en_name: "Vehicles", icon: "🚗" },
    Category { id: "phones", so_name: "Telefoonada", en_name: "Mobile Phones", icon: "📱" },
    Category { id: "electronics", so_name: "Aaladaha", en_name: "Electronics", icon: "💻" },
    Category { id: "fashion", so_name: "Dharka & Quruxda", en_name: "Fashion & Beauty", icon: "👗" },
    Category { id: "home", so_name: "Guriga & Beerta", en_name: "Home & Garden", icon: "🏠" },
    Category { id: "jobs", so_name: "Shaqooyinka", en_name: "Jobs", icon: "💼" },
    Category { id: "services", so_name: "Adeegyada", en_name: "Services", icon: "🔧" },
    Category { id: "real-estate", so_name: "Dhulka & Guryaha", en_name: "Real Estate", icon: "🏢" },
    Category { id: "animals", so_name: "Xayawaanka", en_name: "Animals & Pets", icon: "🐕" },
    Category { id: "sports", so_name: "Ciyaaraha", en_name: "Sports & Hobbies", icon: "⚽" },
];

const fn somalia(name: &'static str) -> Region {
    Region { name, country: Country::Somalia }
}

const fn kenya(name: &'static str) -> Region {
    Region { name, country: Country::Kenya }
}

const fn djibouti(name: &'static str) -> Region {
    Region { name, country: Country::Djibouti }
}

pub const REGIONS: &[Region] = &[
    somalia("Banaadir"),
    somalia("Woqooyi Galbeed"),
    somalia("Bari"),
    somalia("Nugaal"),
    somalia("Mudug"),
    somalia("Galguduud"),
    somalia("Hiiraan"),
    somalia("Shabeellaha Dhexe"),
    somalia("Shabeellaha Hoose"),
    somalia("Bay"),
    somalia("Bakool"),
    somalia("Gedo"),
    somalia("Jubbada Dhexe"),
    somalia("Jubbada Hoose"),
    somalia("Awdal"),
    somalia("Togdheer"),
    somalia("Sanaag"),
    somalia("Sool"),
    somalia("Maroodi Jeex"),
    somalia("Sahil"),
    kenya("Nairobi"),
    kenya("Mombasa"),
    kenya("Kisumu"),
    kenya("Nakuru"),
    kenya("Eldoret"),
    kenya("Kiambu"),
    kenya("Machakos"),
    kenya("Meru"),
    kenya("Nyeri"),
    kenya("Kakamega"),
    kenya("Kilifi"),
    kenya("Kwale"),
    djibouti("Djibouti City"),
    djibouti("Ali Sabieh"),
    djibouti("Dikhil"),
    djibouti("Tadjourah"),
    djibouti("Obock"),
    djibouti("Arta"),
];

pub fn category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

pub fn region(name: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.name == name)
}

/// Phone prefix to pre-fill for a shop in `region`. Unknown regions get
/// the Somali prefix.
pub fn dial_code_for_region(name: &str) -> &'static str {
    region(name)
        .map(|r| r.country.dial_code())
        .unwrap_or(Country::Somalia.dial_code())
}

/// Format tags and built-in lookup tables shared across the crate.
use crate::types::Field;

// Declared format tags (compared case-insensitively)
pub const FORMAT_CSV: &str = "CSV";
pub const FORMAT_JSON: &str = "JSON";
pub const FORMAT_API: &str = "API";
pub const FORMAT_XLS: &str = "XLS";
pub const FORMAT_XLSX: &str = "XLSX";

/// Container keys probed, in order, when a JSON document's root is an object.
pub const JSON_CONTAINER_KEYS: [&str; 3] = ["data", "records", "features"];

/// Filtered rows kept as individual diagnostics per blob
pub const FILTERED_DIAGNOSTIC_LIMIT: usize = 100;

/// Byte order mark some portals prepend to UTF-8 exports
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiters considered when sniffing a CSV sample, in tie-break order.
pub const CSV_DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
pub const CSV_SNIFF_MAX_LINES: usize = 10;
pub const CSV_SNIFF_MAX_BYTES: usize = 4096;

/// Separator placed between street and house when an address is assembled.
pub const ADDRESS_JOINER: &str = ", ";

/// Column order of exported records
pub const EXPORT_HEADER: [&str; 8] = [
    "name",
    "edrpou",
    "address",
    "phone",
    "email",
    "region",
    "city",
    "source_dataset_url",
];

/// Built-in alias lists, highest priority first.
pub const DEFAULT_FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Name,
        &["Назва", "Назва ОСББ", "Повна назва", "OSBB_NAME", "TheNameOfTheACMB", "entityName"],
    ),
    (
        Field::Edrpou,
        &["ЄДРПОУ", "Код ЄДРПОУ", "ЕДРПОУ", "Code", "EDRPOU", "osbb_edrpoy"],
    ),
    (
        Field::Address,
        &[
            "Адреса",
            "Місцезнаходження",
            "Юридична адреса",
            "Address",
            "ADDR",
            "Місцезнаходження юридичної особи",
            "LegalAddress",
        ],
    ),
    (
        Field::Phone,
        &["Телефон", "Phone", "osbb_phone", "Phone_number", "Номер телефону", "ContactTel"],
    ),
    (Field::Email, &["Email", "E-mail", "Електронна пошта"]),
    (Field::Region, &["Область", "region", "addressAdminUnitL2", "address_admin_unit_l2"]),
    (Field::City, &["Місто", "city", "addressPostName", "adminunitl4"]),
    (
        Field::AddressStreet,
        &["addressThoroughfare", "Street", "Вулиця", "address_thoroughfare"],
    ),
    (
        Field::AddressHouse,
        &[
            "addressLocatorDesignator",
            "address_locator_designator",
            "House",
            "Номер будинку",
            "будинок",
        ],
    ),
];

/// Dataset page URL fragments and the city each dataset covers. Order matters:
/// the first fragment contained in a record's provenance URL wins.
pub const DEFAULT_CITY_RULES: &[(&str, &str)] = &[
    ("https://data.gov.ua/dataset/0003", "Хмельницький"),
    ("https://data.gov.ua/dataset/__324", "Дрогобич"),
    ("https://data.gov.ua/dataset/5c0171c0-2851-4a72-9646-5509d58b11ef", "Чортків"),
    ("https://data.gov.ua/dataset/ttepejiik-ocbb-m-bihhnur", "Вінниця"),
    ("https://data.gov.ua/dataset/b89a2378-cf8b-47d7-9d87-40025094d3b3", "Трускавець"),
    ("https://data.gov.ua/dataset/perelik-osbb", "Львів"),
    ("https://data.gov.ua/dataset/39e1fdeb-d151-4ab0-914d-1733f3177dba", "Луцьк"),
    ("https://data.gov.ua/dataset/6b8c98bc-50b2-4ff8-a027-18bf234f7edf", "Бровари"),
    ("https://data.gov.ua/dataset/aed6faf1-e11d-4284-8b08-f1009340ec23", "Ужгород"),
    (
        "https://data.gov.ua/dataset/3-13-perelik-obednan-spivvlasnykiv-bagatokvartyrnyh-budynkiv-osbb-vmtg",
        "Вінниця",
    ),
    ("https://data.gov.ua/dataset/perelik-osbb-mista-vinnytsiia", "Вінниця"),
    (
        "https://data.gov.ua/dataset/perelik-stvorenikh-ob-iednan-spivvlasnikiv-baratokvartirnikh-budinkiv",
        "Дубно",
    ),
    ("https://data.gov.ua/dataset/zytlovi-budynky-lvova", "Львів"),
];

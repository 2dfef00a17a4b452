use serde::Serialize;

/// A Socrata dataset the server knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dataset {
    /// Four-by-four Socrata identifier.
    pub id: &'static str,
    /// Short source id reported in envelopes.
    pub source: &'static str,
    pub name: &'static str,
    pub agency: &'static str,
    /// Field used to bound queries by the time window.
    pub date_field: &'static str,
}

pub const SERVICE_REQUESTS_311: Dataset = Dataset {
    id: "erm2-nwe9",
    source: "nyc_311",
    name: "311 Service Requests from 2010 to Present",
    agency: "311",
    date_field: "created_date",
};

pub const HPD_VIOLATIONS: Dataset = Dataset {
    id: "wvxf-dwi5",
    source: "hpd_violations",
    name: "Housing Maintenance Code Violations",
    agency: "HPD",
    date_field: "inspectiondate",
};

pub const STREET_CLOSURES: Dataset = Dataset {
    id: "i6b5-j7bu",
    source: "dot_street_closures",
    name: "Street Closures due to construction activities by Block",
    agency: "DOT",
    date_field: "work_start_date",
};

pub const PERMITTED_EVENTS: Dataset = Dataset {
    id: "tvpp-9vvx",
    source: "nyc_permitted_events",
    name: "NYC Permitted Event Information",
    agency: "CECM",
    date_field: "start_date_time",
};

pub const PLUTO: Dataset = Dataset {
    id: "64uk-42ks",
    source: "dcp_pluto",
    name: "Primary Land Use Tax Lot Output (PLUTO)",
    agency: "DCP",
    date_field: "",
};

pub static DATASETS: [Dataset; 5] = [
    SERVICE_REQUESTS_311,
    HPD_VIOLATIONS,
    STREET_CLOSURES,
    PERMITTED_EVENTS,
    PLUTO,
];

pub const EVENT_311_COMPLAINT: &str = "311_complaint";
pub const EVENT_311_TREND: &str = "311_complaint_trend";
pub const EVENT_HPD_VIOLATION: &str = "hpd_violation";
pub const EVENT_STREET_CLOSURE: &str = "street_closure";
pub const EVENT_PERMITTED_EVENT: &str = "permitted_event";
pub const EVENT_BUILDING_PROFILE: &str = "building_profile";

pub const HPD_VIOLATION_CLASSES: [&str; 4] = ["A", "B", "C", "I"];

pub mod fields {
    pub mod sr311 {
        pub const UNIQUE_KEY: &str = "unique_key";
        pub const CREATED_DATE: &str = "created_date";
        pub const CLOSED_DATE: &str = "closed_date";
        pub const COMPLAINT_TYPE: &str = "complaint_type";
        pub const DESCRIPTOR: &str = "descriptor";
        pub const STATUS: &str = "status";
        pub const AGENCY: &str = "agency";
        pub const BOROUGH: &str = "borough";
        pub const COMMUNITY_BOARD: &str = "community_board";
        pub const INCIDENT_ZIP: &str = "incident_zip";
        pub const INCIDENT_ADDRESS: &str = "incident_address";
        pub const BBL: &str = "bbl";
        pub const LATITUDE: &str = "latitude";
        pub const LONGITUDE: &str = "longitude";
    }

    pub mod hpd {
        pub const VIOLATION_ID: &str = "violationid";
        pub const INSPECTION_DATE: &str = "inspectiondate";
        pub const CLASS: &str = "class";
        pub const BORO: &str = "boro";
        pub const BORO_ID: &str = "boroid";
        pub const BLOCK: &str = "block";
        pub const LOT: &str = "lot";
        pub const BBL: &str = "bbl";
        pub const COMMUNITY_BOARD: &str = "communityboard";
        pub const STATUS: &str = "violationstatus";
        pub const CURRENT_STATUS: &str = "currentstatus";
        pub const DESCRIPTION: &str = "novdescription";
        pub const HOUSE_NUMBER: &str = "housenumber";
        pub const STREET_NAME: &str = "streetname";
        pub const LATITUDE: &str = "latitude";
        pub const LONGITUDE: &str = "longitude";
    }

    pub mod closures {
        pub const SEGMENT_ID: &str = "segmentid";
        pub const ON_STREET: &str = "onstreetname";
        pub const FROM_STREET: &str = "fromstreetname";
        pub const TO_STREET: &str = "tostreetname";
        pub const BOROUGH_CODE: &str = "borough_code";
        pub const WORK_START: &str = "work_start_date";
        pub const WORK_END: &str = "work_end_date";
        pub const PURPOSE: &str = "purpose";
        pub const PURPOSES: &str = "purposes";
    }

    pub mod events {
        pub const EVENT_ID: &str = "event_id";
        pub const EVENT_NAME: &str = "event_name";
        pub const START: &str = "start_date_time";
        pub const END: &str = "end_date_time";
        pub const AGENCY: &str = "event_agency";
        pub const EVENT_TYPE: &str = "event_type";
        pub const BOROUGH: &str = "event_borough";
        pub const LOCATION: &str = "event_location";
        pub const LOCATIONS: &str = "event_locations";
        pub const CLOSURE_TYPE: &str = "street_closure_type";
        pub const COMMUNITY_BOARD: &str = "community_board";
    }

    pub mod pluto {
        pub const BBL: &str = "bbl";
        pub const BOROUGH: &str = "borough";
        pub const CD: &str = "cd";
        pub const ADDRESS: &str = "address";
        pub const LAND_USE: &str = "landuse";
        pub const BUILDING_CLASS: &str = "bldgclass";
        pub const NUM_FLOORS: &str = "numfloors";
        pub const UNITS_RES: &str = "unitsres";
        pub const UNITS_TOTAL: &str = "unitstotal";
        pub const YEAR_BUILT: &str = "yearbuilt";
        pub const OWNER_NAME: &str = "ownername";
        pub const ZIP_CODE: &str = "zipcode";
        pub const ASSESSED_TOTAL: &str = "assesstot";
        pub const LATITUDE: &str = "latitude";
        pub const LONGITUDE: &str = "longitude";
    }
}

#[must_use]
pub fn dataset_by_source(source: &str) -> Option<&'static Dataset> {
    DATASETS.iter().find(|dataset| dataset.source == source)
}

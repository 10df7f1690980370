//! Inquiry Email Templates
//!
//! One fixed HTML layout per inquiry/booking collection. Field names follow
//! the collection schemas exactly, typos included.

use hooks_core::Record;
use std::fmt::Write as _;

/// How a field is read from the record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Count,
}

/// One labelled line of a template
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub label: &'static str,
    pub field: &'static str,
    pub kind: FieldKind,
}

const fn text(label: &'static str, field: &'static str) -> FieldSpec {
    FieldSpec {
        label,
        field,
        kind: FieldKind::Text,
    }
}

const fn count(label: &'static str, field: &'static str) -> FieldSpec {
    FieldSpec {
        label,
        field,
        kind: FieldKind::Count,
    }
}

const TASTER_BOX_FIELDS: &[FieldSpec] = &[
    text("Event Type", "event_type"),
    text("Event Date", "event_date"),
    text("Event Venue", "event_venue"),
    text("Delivery Time", "delivery_time"),
    count("No of Taster Boxes", "no_of_taster_boxes"),
    text("Flavours List", "flavlors_list"),
    text("Dietary Needs", "dietary_needs"),
    text("Company Name", "company_name"),
    text("Contact Name", "contact_name"),
    text("Email", "email"),
    text("Phone Number", "phone_number"),
    text("Additional Details", "additional_details"),
];

const BESPOKE_CAKE_FIELDS: &[FieldSpec] = &[
    text("Event Date", "event_date"),
    text("Event Time", "event_time"),
    text("Theme", "theme"),
    count("Number of Tiers", "number_of_tiers"),
    text("Tier Shape", "tier_shape"),
    text("Size", "size"),
    text("Flavours", "flavours"),
    text("Dietary Needs", "dietary_needs"),
    text("Design Inspiration", "design_inspiration"),
    text("Couple's Names", "couples_names"),
    text("Email", "email"),
    text("Phone Number", "phone_number"),
    text("Additional Details", "additional_details"),
];

const WEDDING_CAKE_FIELDS: &[FieldSpec] = &[
    text("Wedding Date", "wedding_date"),
    text("Wedding Venue", "wedding_venue"),
    count("Number of Tiers", "number_of_tiers"),
    text("Number of Guests", "number_of_guests"),
    text("Cake Flavours", "cake_flavours"),
    text("Dietary Needs", "dietary_needs"),
    text("Design Inspiration", "design_inspiration"),
    text("Email", "email"),
    text("Phone Number", "phone_number"),
    text("Additional Details", "additional_details"),
];

const WORKSHOP_BOOKING_FIELDS: &[FieldSpec] = &[
    text("Full Name", "full_name"),
    text("Email", "email"),
    text("Phone Number", "phone_number"),
    count("Number of Participants", "Number_of_participants"),
    text("Preferred Date", "preferred_date"),
    text("Type and Flavour", "type_and_flavour"),
    text("Desired Outcome", "desired_outcome"),
    text("Additional Details", "additional_details"),
];

const GENERAL_INQUIRY_FIELDS: &[FieldSpec] = &[
    text("Name", "name"),
    text("Email", "email"),
    text("Phone Number", "phone_number"),
    text("Subject", "subject"),
    text("Message", "message"),
];

/// Collections that trigger an operator notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InquiryKind {
    TasterBox,
    BespokeCake,
    WeddingCake,
    WorkshopBooking,
    General,
}

impl InquiryKind {
    pub const ALL: [Self; 5] = [
        Self::TasterBox,
        Self::BespokeCake,
        Self::WeddingCake,
        Self::WorkshopBooking,
        Self::General,
    ];

    /// Match a collection name, ignoring case
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection().eq_ignore_ascii_case(collection))
    }

    /// Canonical collection name
    pub const fn collection(&self) -> &'static str {
        match self {
            Self::TasterBox => "TasterBoxInquiry",
            Self::BespokeCake => "bespokecakeinquiry",
            Self::WeddingCake => "weddingcakeinquiry",
            Self::WorkshopBooking => "workshopbooking",
            Self::General => "inquiry",
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::TasterBox => "TasterBox Inquiry Details",
            Self::BespokeCake => "Bespoke Cake Inquiry Details",
            Self::WeddingCake => "Wedding Cake Inquiry Details",
            Self::WorkshopBooking => "Workshop Booking Details",
            Self::General => "Inquiry Details",
        }
    }

    pub const fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::TasterBox => TASTER_BOX_FIELDS,
            Self::BespokeCake => BESPOKE_CAKE_FIELDS,
            Self::WeddingCake => WEDDING_CAKE_FIELDS,
            Self::WorkshopBooking => WORKSHOP_BOOKING_FIELDS,
            Self::General => GENERAL_INQUIRY_FIELDS,
        }
    }

    /// Render the HTML body for a record of this kind
    pub fn render(&self, record: &Record) -> String {
        let mut html = format!("<h1>{}</h1>\n", self.title());

        for spec in self.fields() {
            let value = match spec.kind {
                FieldKind::Text => record.get_string(spec.field),
                FieldKind::Count => record.get_int(spec.field).to_string(),
            };
            let _ = writeln!(
                html,
                "<p><strong>{}:</strong> {}</p>",
                spec.label,
                html_escape::encode_text(&value)
            );
        }

        html
    }
}

/// Subject line for a newly created record
pub fn subject_for(collection: &str) -> String {
    format!("New Record Created - {collection}")
}

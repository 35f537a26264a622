//! Route 53 XML codec
//!
//! Wire documents of the `2013-04-01` API, mapped to and from the
//! provider-neutral types in `zonesync_core::traits`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zonesync_core::record::{AliasTarget, Failover};
use zonesync_core::traits::{
    ChangeInfo, ChangeResourceRecordSetsRequest, ChangeStatus, ListResourceRecordSetsOutput,
    ResourceRecord, ResourceRecordSet,
};
use zonesync_core::{Error, Result};

/// XML namespace of the Route 53 API
pub const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

// Element order follows the API schema; Route 53 rejects out-of-order
// elements.
#[derive(Debug, Serialize, Deserialize)]
struct RecordSetXml {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "SetIdentifier", default, skip_serializing_if = "Option::is_none")]
    set_identifier: Option<String>,
    #[serde(rename = "Failover", default, skip_serializing_if = "Option::is_none")]
    failover: Option<String>,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(rename = "ResourceRecords", default, skip_serializing_if = "Option::is_none")]
    resource_records: Option<ResourceRecordsXml>,
    #[serde(rename = "AliasTarget", default, skip_serializing_if = "Option::is_none")]
    alias_target: Option<AliasTargetXml>,
    #[serde(rename = "HealthCheckId", default, skip_serializing_if = "Option::is_none")]
    health_check_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResourceRecordsXml {
    #[serde(rename = "ResourceRecord", default)]
    items: Vec<ResourceRecordXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceRecordXml {
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AliasTargetXml {
    #[serde(rename = "HostedZoneId")]
    hosted_zone_id: String,
    #[serde(rename = "DNSName")]
    dns_name: String,
    #[serde(rename = "EvaluateTargetHealth", default)]
    evaluate_target_health: bool,
}

#[derive(Debug, Serialize)]
struct ChangeRequestXml {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "ChangeBatch")]
    change_batch: ChangeBatchXml,
}

#[derive(Debug, Serialize)]
struct ChangeBatchXml {
    #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(rename = "Changes")]
    changes: ChangesXml,
}

#[derive(Debug, Serialize)]
struct ChangesXml {
    #[serde(rename = "Change")]
    items: Vec<ChangeXml>,
}

#[derive(Debug, Serialize)]
struct ChangeXml {
    #[serde(rename = "Action")]
    action: &'static str,
    #[serde(rename = "ResourceRecordSet")]
    resource_record_set: RecordSetXml,
}

#[derive(Debug, Deserialize)]
struct ListResponseXml {
    #[serde(rename = "ResourceRecordSets", default)]
    resource_record_sets: RecordSetsXml,
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "NextRecordName", default)]
    next_record_name: Option<String>,
    #[serde(rename = "NextRecordType", default)]
    next_record_type: Option<String>,
    #[serde(rename = "MaxItems", default)]
    max_items: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordSetsXml {
    #[serde(rename = "ResourceRecordSet", default)]
    items: Vec<RecordSetXml>,
}

#[derive(Debug, Deserialize)]
struct ChangeResponseXml {
    #[serde(rename = "ChangeInfo")]
    change_info: ChangeInfoXml,
}

#[derive(Debug, Deserialize)]
struct ChangeInfoXml {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "SubmittedAt", default)]
    submitted_at: Option<String>,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseXml {
    #[serde(rename = "Error")]
    error: ErrorXml,
}

#[derive(Debug, Deserialize)]
struct ErrorXml {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct InvalidChangeBatchXml {
    #[serde(rename = "Messages", default)]
    messages: MessagesXml,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesXml {
    #[serde(rename = "Message", default)]
    items: Vec<String>,
}

impl From<&ResourceRecordSet> for RecordSetXml {
    fn from(set: &ResourceRecordSet) -> Self {
        let resource_records = if set.resource_records.is_empty() {
            None
        } else {
            Some(ResourceRecordsXml {
                items: set
                    .resource_records
                    .iter()
                    .map(|r| ResourceRecordXml {
                        value: r.value.clone(),
                    })
                    .collect(),
            })
        };

        Self {
            name: set.name.clone(),
            record_type: set.record_type.clone(),
            set_identifier: set.set_identifier.clone(),
            failover: set.failover.map(|f| f.as_str().to_string()),
            ttl: set.ttl,
            resource_records,
            alias_target: set.alias_target.as_ref().map(|t| AliasTargetXml {
                hosted_zone_id: t.hosted_zone_id.clone(),
                dns_name: t.dns_name.clone(),
                evaluate_target_health: t.evaluate_target_health,
            }),
            health_check_id: set.health_check_id.clone(),
        }
    }
}

impl TryFrom<RecordSetXml> for ResourceRecordSet {
    type Error = Error;

    fn try_from(xml: RecordSetXml) -> Result<Self> {
        let failover = xml
            .failover
            .as_deref()
            .map(str::parse::<Failover>)
            .transpose()
            .map_err(|e| Error::decode(e.to_string()))?;

        Ok(Self {
            name: decode_name(&xml.name),
            record_type: xml.record_type,
            ttl: xml.ttl,
            resource_records: xml
                .resource_records
                .unwrap_or_default()
                .items
                .into_iter()
                .map(|r| ResourceRecord::new(r.value))
                .collect(),
            alias_target: xml.alias_target.map(|t| AliasTarget {
                hosted_zone_id: t.hosted_zone_id,
                dns_name: t.dns_name,
                evaluate_target_health: t.evaluate_target_health,
            }),
            set_identifier: xml.set_identifier,
            failover,
            health_check_id: xml.health_check_id,
        })
    }
}

/// Encode a `ChangeResourceRecordSetsRequest` document
pub fn encode_change_request(request: &ChangeResourceRecordSetsRequest) -> Result<String> {
    let document = ChangeRequestXml {
        xmlns: XMLNS,
        change_batch: ChangeBatchXml {
            comment: request.change_batch.comment.clone(),
            changes: ChangesXml {
                items: request
                    .change_batch
                    .changes
                    .iter()
                    .map(|change| ChangeXml {
                        action: change.action.as_str(),
                        resource_record_set: RecordSetXml::from(&change.resource_record_set),
                    })
                    .collect(),
            },
        },
    };

    let body = quick_xml::se::to_string_with_root("ChangeResourceRecordSetsRequest", &document)
        .map_err(|e| Error::invalid_input(format!("Failed to encode change batch: {}", e)))?;

    Ok(format!("{}\n{}", XML_DECLARATION, body))
}

/// Decode a `ListResourceRecordSetsResponse` document
pub fn decode_list_response(body: &str) -> Result<ListResourceRecordSetsOutput> {
    let xml: ListResponseXml = quick_xml::de::from_str(body)
        .map_err(|e| Error::decode(format!("Invalid ListResourceRecordSets response: {}", e)))?;

    let resource_record_sets = xml
        .resource_record_sets
        .items
        .into_iter()
        .map(ResourceRecordSet::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(ListResourceRecordSetsOutput {
        resource_record_sets,
        is_truncated: xml.is_truncated,
        next_record_name: xml.next_record_name.as_deref().map(decode_name),
        next_record_type: xml.next_record_type,
        max_items: xml.max_items,
    })
}

/// Decode a `ChangeResourceRecordSetsResponse` document
pub fn decode_change_response(body: &str) -> Result<ChangeInfo> {
    let xml: ChangeResponseXml = quick_xml::de::from_str(body)
        .map_err(|e| Error::decode(format!("Invalid ChangeResourceRecordSets response: {}", e)))?;
    let info = xml.change_info;

    let status = match info.status.as_str() {
        "PENDING" => ChangeStatus::Pending,
        "INSYNC" => ChangeStatus::Insync,
        other => return Err(Error::decode(format!("Unknown change status: {}", other))),
    };

    let submitted_at = info
        .submitted_at
        .as_deref()
        .map(|ts| {
            DateTime::parse_from_rfc3339(ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::decode(format!("Invalid SubmittedAt '{}': {}", ts, e)))
        })
        .transpose()?;

    Ok(ChangeInfo {
        id: info.id,
        status,
        submitted_at,
        comment: info.comment,
    })
}

/// Map an unsuccessful response to a service error
///
/// Structured error documents win; the status code is the fallback for
/// bodies that are empty or not XML.
pub fn decode_error(status: u16, body: &str) -> Error {
    if body.contains("<InvalidChangeBatch")
        && let Ok(xml) = quick_xml::de::from_str::<InvalidChangeBatchXml>(body)
    {
        return Error::service("InvalidChangeBatch", xml.messages.items.join("; "));
    }

    if let Ok(xml) = quick_xml::de::from_str::<ErrorResponseXml>(body) {
        return Error::service(xml.error.code, xml.error.message);
    }

    let detail = body.trim();
    let detail = if detail.is_empty() {
        format!("HTTP status {}", status)
    } else {
        format!("HTTP status {}: {}", status, detail)
    };

    match status {
        400 => Error::service("BadRequest", detail),
        401 | 403 => Error::service("AccessDenied", detail),
        404 => Error::service("NotFound", detail),
        429 => Error::service("Throttling", detail),
        500..=599 => Error::service("ServiceUnavailable", detail),
        _ => Error::service("UnexpectedStatus", detail),
    }
}

/// Decode `\ddd` octal escapes Route 53 uses in returned names
///
/// `\052.example.com.` becomes `*.example.com.`.
pub fn decode_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(code) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

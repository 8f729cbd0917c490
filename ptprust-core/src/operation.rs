//! PTP operation and response codes, and the values exchanged per transaction

use std::fmt;

use crate::error::{Error, Result};

/// Operation codes
///
/// Standard PTP operations (ISO 15740) plus the Canon EOS vendor set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OperationCode {
    // Standard operations
    GetDeviceInfo = 0x1001,
    OpenSession = 0x1002,
    CloseSession = 0x1003,
    GetStorageIds = 0x1004,
    GetStorageInfo = 0x1005,
    GetNumObjects = 0x1006,
    GetObjectHandles = 0x1007,
    GetObjectInfo = 0x1008,
    GetObject = 0x1009,
    GetThumb = 0x100A,
    DeleteObject = 0x100B,
    SendObjectInfo = 0x100C,
    SendObject = 0x100D,
    InitiateCapture = 0x100E,
    FormatStore = 0x100F,
    ResetDevice = 0x1010,
    SelfTest = 0x1011,
    SetObjectProtection = 0x1012,
    PowerDown = 0x1013,
    GetDevicePropDesc = 0x1014,
    GetDevicePropValue = 0x1015,
    SetDevicePropValue = 0x1016,
    ResetDevicePropValue = 0x1017,
    TerminateOpenCapture = 0x1018,
    MoveObject = 0x1019,
    CopyObject = 0x101A,
    GetPartialObject = 0x101B,
    InitiateOpenCapture = 0x101C,

    // Canon EOS operations
    EosGetStorageIds = 0x9101,
    EosGetStorageInfo = 0x9102,
    EosGetObjectInfo = 0x9103,
    EosGetObject = 0x9104,
    EosDeleteObject = 0x9105,
    EosFormatStore = 0x9106,
    EosGetPartialObject = 0x9107,
    EosGetDeviceInfoEx = 0x9108,
    EosGetObjectInfoEx = 0x9109,
    EosGetThumbEx = 0x910A,
    EosSendPartialObject = 0x910B,
    EosSetObjectAttributes = 0x910C,
    EosGetObjectTime = 0x910D,
    EosSetObjectTime = 0x910E,
    EosRemoteRelease = 0x910F,
    EosSetDevicePropValueEx = 0x9110,
    EosGetRemoteMode = 0x9113,
    EosSetRemoteMode = 0x9114,
    EosSetEventMode = 0x9115,
    EosGetEvent = 0x9116,
    EosTransferComplete = 0x9117,
    EosCancelTransfer = 0x9118,
    EosResetTransfer = 0x9119,
    EosPcHddCapacity = 0x911A,
    EosSetUiLock = 0x911B,
    EosResetUiLock = 0x911C,
    EosKeepDeviceOn = 0x911D,
    EosBulbStart = 0x9125,
    EosBulbEnd = 0x9126,
    EosRequestDevicePropValue = 0x9127,
    EosRemoteReleaseOn = 0x9128,
    EosRemoteReleaseOff = 0x9129,
    EosInitiateViewfinder = 0x9151,
    EosTerminateViewfinder = 0x9152,
    EosGetViewfinderData = 0x9153,
    EosDoAf = 0x9154,
    EosDriveLens = 0x9155,
    EosDepthOfFieldPreview = 0x9156,
    EosClickWb = 0x9157,
    EosZoom = 0x9158,
    EosZoomPosition = 0x9159,
    EosSetLiveAfFrame = 0x915A,
    EosAfCancel = 0x9160,
}

impl OperationCode {
    const ALL: &'static [Self] = &[
        Self::GetDeviceInfo,
        Self::OpenSession,
        Self::CloseSession,
        Self::GetStorageIds,
        Self::GetStorageInfo,
        Self::GetNumObjects,
        Self::GetObjectHandles,
        Self::GetObjectInfo,
        Self::GetObject,
        Self::GetThumb,
        Self::DeleteObject,
        Self::SendObjectInfo,
        Self::SendObject,
        Self::InitiateCapture,
        Self::FormatStore,
        Self::ResetDevice,
        Self::SelfTest,
        Self::SetObjectProtection,
        Self::PowerDown,
        Self::GetDevicePropDesc,
        Self::GetDevicePropValue,
        Self::SetDevicePropValue,
        Self::ResetDevicePropValue,
        Self::TerminateOpenCapture,
        Self::MoveObject,
        Self::CopyObject,
        Self::GetPartialObject,
        Self::InitiateOpenCapture,
        Self::EosGetStorageIds,
        Self::EosGetStorageInfo,
        Self::EosGetObjectInfo,
        Self::EosGetObject,
        Self::EosDeleteObject,
        Self::EosFormatStore,
        Self::EosGetPartialObject,
        Self::EosGetDeviceInfoEx,
        Self::EosGetObjectInfoEx,
        Self::EosGetThumbEx,
        Self::EosSendPartialObject,
        Self::EosSetObjectAttributes,
        Self::EosGetObjectTime,
        Self::EosSetObjectTime,
        Self::EosRemoteRelease,
        Self::EosSetDevicePropValueEx,
        Self::EosGetRemoteMode,
        Self::EosSetRemoteMode,
        Self::EosSetEventMode,
        Self::EosGetEvent,
        Self::EosTransferComplete,
        Self::EosCancelTransfer,
        Self::EosResetTransfer,
        Self::EosPcHddCapacity,
        Self::EosSetUiLock,
        Self::EosResetUiLock,
        Self::EosKeepDeviceOn,
        Self::EosBulbStart,
        Self::EosBulbEnd,
        Self::EosRequestDevicePropValue,
        Self::EosRemoteReleaseOn,
        Self::EosRemoteReleaseOff,
        Self::EosInitiateViewfinder,
        Self::EosTerminateViewfinder,
        Self::EosGetViewfinderData,
        Self::EosDoAf,
        Self::EosDriveLens,
        Self::EosDepthOfFieldPreview,
        Self::EosClickWb,
        Self::EosZoom,
        Self::EosZoomPosition,
        Self::EosSetLiveAfFrame,
        Self::EosAfCancel,
    ];

    /// Check if this is a Canon EOS vendor operation
    pub fn is_vendor(self) -> bool {
        (self as u16) & 0xF000 == 0x9000
    }
}

impl From<OperationCode> for u16 {
    fn from(code: OperationCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for OperationCode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| *code as u16 == value)
            .ok_or(Error::UnknownOperation(value))
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:04X})", self, *self as u16)
    }
}

/// Response codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResponseCode {
    Undefined = 0x2000,
    Ok = 0x2001,
    GeneralError = 0x2002,
    SessionNotOpen = 0x2003,
    InvalidTransactionId = 0x2004,
    OperationNotSupported = 0x2005,
    ParameterNotSupported = 0x2006,
    IncompleteTransfer = 0x2007,
    InvalidStorageId = 0x2008,
    InvalidObjectHandle = 0x2009,
    DevicePropNotSupported = 0x200A,
    InvalidObjectFormatCode = 0x200B,
    StoreFull = 0x200C,
    ObjectWriteProtected = 0x200D,
    StoreReadOnly = 0x200E,
    AccessDenied = 0x200F,
    NoThumbnailPresent = 0x2010,
    SelfTestFailed = 0x2011,
    PartialDeletion = 0x2012,
    StoreNotAvailable = 0x2013,
    SpecificationByFormatUnsupported = 0x2014,
    NoValidObjectInfo = 0x2015,
    InvalidCodeFormat = 0x2016,
    UnknownVendorCode = 0x2017,
    CaptureAlreadyTerminated = 0x2018,
    DeviceBusy = 0x2019,
    InvalidParentObject = 0x201A,
    InvalidDevicePropFormat = 0x201B,
    InvalidDevicePropValue = 0x201C,
    InvalidParameter = 0x201D,
    SessionAlreadyOpen = 0x201E,
    TransactionCancelled = 0x201F,
    SpecificationOfDestinationUnsupported = 0x2020,
}

impl From<ResponseCode> for u16 {
    fn from(code: ResponseCode) -> u16 {
        code as u16
    }
}

impl TryFrom<u16> for ResponseCode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x2000 => Ok(Self::Undefined),
            0x2001 => Ok(Self::Ok),
            0x2002 => Ok(Self::GeneralError),
            0x2003 => Ok(Self::SessionNotOpen),
            0x2004 => Ok(Self::InvalidTransactionId),
            0x2005 => Ok(Self::OperationNotSupported),
            0x2006 => Ok(Self::ParameterNotSupported),
            0x2007 => Ok(Self::IncompleteTransfer),
            0x2008 => Ok(Self::InvalidStorageId),
            0x2009 => Ok(Self::InvalidObjectHandle),
            0x200A => Ok(Self::DevicePropNotSupported),
            0x200B => Ok(Self::InvalidObjectFormatCode),
            0x200C => Ok(Self::StoreFull),
            0x200D => Ok(Self::ObjectWriteProtected),
            0x200E => Ok(Self::StoreReadOnly),
            0x200F => Ok(Self::AccessDenied),
            0x2010 => Ok(Self::NoThumbnailPresent),
            0x2011 => Ok(Self::SelfTestFailed),
            0x2012 => Ok(Self::PartialDeletion),
            0x2013 => Ok(Self::StoreNotAvailable),
            0x2014 => Ok(Self::SpecificationByFormatUnsupported),
            0x2015 => Ok(Self::NoValidObjectInfo),
            0x2016 => Ok(Self::InvalidCodeFormat),
            0x2017 => Ok(Self::UnknownVendorCode),
            0x2018 => Ok(Self::CaptureAlreadyTerminated),
            0x2019 => Ok(Self::DeviceBusy),
            0x201A => Ok(Self::InvalidParentObject),
            0x201B => Ok(Self::InvalidDevicePropFormat),
            0x201C => Ok(Self::InvalidDevicePropValue),
            0x201D => Ok(Self::InvalidParameter),
            0x201E => Ok(Self::SessionAlreadyOpen),
            0x201F => Ok(Self::TransactionCancelled),
            0x2020 => Ok(Self::SpecificationOfDestinationUnsupported),
            _ => Err(Error::UnknownResponse(value)),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:04X})", self, *self as u16)
    }
}

/// An operation to send: code plus up to five parameters
///
/// Immutable once built.
///
/// # Examples
///
/// ```
/// use ptprust_core::{Operation, OperationCode};
///
/// let op = Operation::with_params(OperationCode::EosSetEventMode, [1]).unwrap();
/// assert_eq!(op.code(), 0x9115);
/// assert_eq!(op.params(), &[1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    code: u16,
    params: Vec<u32>,
}

impl Operation {
    /// Maximum number of parameters per operation
    pub const MAX_PARAMS: usize = 5;

    /// Create an operation without parameters
    pub fn new(code: impl Into<u16>) -> Self {
        Self {
            code: code.into(),
            params: Vec::new(),
        }
    }

    /// Create an operation with parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyParameters`] for more than five parameters.
    pub fn with_params(
        code: impl Into<u16>,
        params: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let params: Vec<u32> = params.into_iter().collect();

        if params.len() > Self::MAX_PARAMS {
            return Err(Error::TooManyParameters {
                count: params.len(),
                max: Self::MAX_PARAMS,
            });
        }

        Ok(Self {
            code: code.into(),
            params,
        })
    }

    /// Raw operation code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Parameters in wire order
    pub fn params(&self) -> &[u32] {
        &self.params
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match OperationCode::try_from(self.code) {
            Ok(code) => write!(f, "{}{:X?}", code, self.params),
            Err(_) => write!(f, "0x{:04X}{:X?}", self.code, self.params),
        }
    }
}

/// Result of a completed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Raw response code
    pub code: u16,

    /// Transaction this response answers
    pub transaction_id: u32,

    /// Returned parameters (up to five)
    pub params: Vec<u32>,
}

impl Response {
    /// Create a response
    pub fn new(code: impl Into<u16>, transaction_id: u32, params: Vec<u32>) -> Self {
        Self {
            code: code.into(),
            transaction_id,
            params,
        }
    }

    /// Check if the device answered `OK`
    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok as u16
    }

    /// Typed response code, if it is a standard one
    pub fn response_code(&self) -> Option<ResponseCode> {
        ResponseCode::try_from(self.code).ok()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response_code() {
            Some(code) => write!(f, "{}", code)?,
            None => write!(f, "0x{:04X}", self.code)?,
        }
        write!(f, "(tx={}, params={:X?})", self.transaction_id, self.params)
    }
}

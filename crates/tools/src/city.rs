//! Korean city name resolution.
//!
//! OpenWeatherMap matches `q=` against English names, so Korean city names
//! are translated through a fixed table before the lookup. Names the table
//! does not know pass through untouched, which lets callers use English
//! names directly.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Korean name → English name, one entry per city.
const CITIES: &[(&str, &str)] = &[
    ("서울", "Seoul"),
    ("부산", "Busan"),
    ("대구", "Daegu"),
    ("인천", "Incheon"),
    ("광주", "Gwangju"),
    ("대전", "Daejeon"),
    ("울산", "Ulsan"),
    ("수원", "Suwon"),
    ("창원", "Changwon"),
    ("고양", "Goyang"),
    ("용인", "Yongin"),
    ("성남", "Seongnam"),
    ("청주", "Cheongju"),
    ("안산", "Ansan"),
    ("전주", "Jeonju"),
    ("제주", "Jeju"),
    ("천안", "Cheonan"),
    ("남양주", "Namyangju"),
    ("김해", "Gimhae"),
    ("안양", "Anyang"),
    ("포항", "Pohang"),
    ("구미", "Gumi"),
    ("춘천", "Chuncheon"),
    ("강릉", "Gangneung"),
    ("원주", "Wonju"),
    ("여수", "Yeosu"),
    ("순천", "Suncheon"),
    ("목포", "Mokpo"),
    ("군산", "Gunsan"),
    ("익산", "Iksan"),
    ("경주", "Gyeongju"),
    ("안동", "Andong"),
    ("충주", "Chungju"),
    ("제천", "Jecheon"),
    ("동해", "Donghae"),
    ("속초", "Sokcho"),
    ("서귀포", "Seogwipo"),
    ("통영", "Tongyeong"),
    ("거제", "Geoje"),
    ("김천", "Gimcheon"),
    ("양산", "Yangsan"),
    ("경산", "Gyeongsan"),
    ("파주", "Paju"),
    ("의정부", "Uijeongbu"),
    ("하남", "Hanam"),
    ("화성", "Hwaseong"),
    ("평택", "Pyeongtaek"),
    ("시흥", "Siheung"),
    ("광명", "Gwangmyeong"),
    ("군포", "Gunpo"),
    ("오산", "Osan"),
    ("이천", "Icheon"),
    ("안성", "Anseong"),
    ("양주", "Yangju"),
    ("구리", "Guri"),
    ("남원", "Namwon"),
    ("정읍", "Jeongeup"),
    ("김제", "Gimje"),
    ("사천", "Sacheon"),
    ("밀양", "Miryang"),
    ("영주", "Yeongju"),
    ("상주", "Sangju"),
    ("문경", "Mungyeong"),
    ("공주", "Gongju"),
    ("보령", "Boryeong"),
    ("서산", "Seosan"),
    ("논산", "Nonsan"),
    ("계룡", "Gyeryong"),
    ("당진", "Dangjin"),
    ("예산", "Yesan"),
    ("홍성", "Hongseong"),
    ("청양", "Cheongyang"),
    ("부여", "Buyeo"),
    ("서천", "Seocheon"),
    ("금산", "Geumsan"),
    ("아산", "Asan"),
    ("태안", "Taean"),
    ("음성", "Eumseong"),
    ("진천", "Jincheon"),
    ("괴산", "Goesan"),
    ("단양", "Danyang"),
    ("영동", "Yeongdong"),
    ("옥천", "Okcheon"),
    ("증평", "Jeungpyeong"),
    ("보은", "Boeun"),
    ("청원", "Cheongwon"),
    ("담양", "Damyang"),
    ("곡성", "Gokseong"),
    ("구례", "Gurye"),
    ("고흥", "Goheung"),
    ("보성", "Boseong"),
    ("화순", "Hwasun"),
    ("장흥", "Jangheung"),
    ("강진", "Gangjin"),
    ("해남", "Haenam"),
    ("영암", "Yeongam"),
    ("무안", "Muan"),
    ("함평", "Hampyeong"),
    ("영광", "Yeonggwang"),
    ("장성", "Jangseong"),
    ("완도", "Wando"),
    ("진도", "Jindo"),
    ("신안", "Sinan"),
    ("고창", "Gochang"),
    ("부안", "Buan"),
    ("순창", "Sunchang"),
    ("임실", "Imsil"),
    ("무주", "Muju"),
    ("진안", "Jinan"),
    ("장수", "Jangsu"),
    ("봉화", "Bonghwa"),
    ("영양", "Yeongyang"),
    ("청도", "Cheongdo"),
    ("고령", "Goryeong"),
    ("성주", "Seongju"),
    ("칠곡", "Chilgok"),
    ("예천", "Yecheon"),
    ("울진", "Uljin"),
    ("영덕", "Yeongdeok"),
    ("울릉", "Ulleung"),
    ("의성", "Uiseong"),
    ("청송", "Cheongsong"),
    ("영천", "Yeongcheon"),
    ("거창", "Geochang"),
    ("함양", "Hamyang"),
    ("산청", "Sancheong"),
    ("합천", "Hapcheon"),
    ("창녕", "Changnyeong"),
    ("고성", "Goseong"),
    ("남해", "Namhae"),
    ("하동", "Hadong"),
    ("함안", "Haman"),
    ("의령", "Uiryeong"),
    ("양평", "Yangpyeong"),
    ("가평", "Gapyeong"),
    ("연천", "Yeoncheon"),
    ("포천", "Pocheon"),
    ("동두천", "Dongducheon"),
    ("과천", "Gwacheon"),
    ("의왕", "Uiwang"),
    ("여주", "Yeoju"),
    ("김포", "Gimpo"),
    ("철원", "Cheorwon"),
    ("화천", "Hwacheon"),
    ("양구", "Yanggu"),
    ("인제", "Inje"),
    ("삼척", "Samcheok"),
    ("태백", "Taebaek"),
    ("정선", "Jeongseon"),
    ("평창", "Pyeongchang"),
    ("횡성", "Hoengseong"),
    ("영월", "Yeongwol"),
    ("완주", "Wanju"),
    ("군위", "Gunwi"),
    ("진주", "Jinju"),
];

static CITY_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| CITIES.iter().copied().collect());

/// Translate a Korean city name into the name the weather service expects.
///
/// Surrounding whitespace is ignored. Unknown names come back unchanged.
pub fn resolve(name: &str) -> String {
    let trimmed = name.trim();
    match CITY_MAP.get(trimmed) {
        Some(english) => (*english).to_string(),
        None => trimmed.to_string(),
    }
}

/// Whether the table has an entry for this name.
pub fn is_known(name: &str) -> bool {
    CITY_MAP.contains_key(name.trim())
}

/// Number of cities in the table.
pub fn len() -> usize {
    CITY_MAP.len()
}
